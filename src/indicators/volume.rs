//! Volume indicators

use crate::series::Column;

/// On-Balance Volume, starting at 0 on the first bar
pub fn obv(closes: &[f64], volumes: &[f64]) -> Column {
    let mut total = 0.0;
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (close, volume))| {
            if i > 0 {
                let prev = closes[i - 1];
                if *close > prev {
                    total += volume;
                } else if *close < prev {
                    total -= volume;
                }
            }
            Some(total)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obv_accumulates_signed_volume() {
        let out = obv(&[10.0, 11.0, 11.0, 9.0], &[100.0, 200.0, 300.0, 50.0]);
        assert_eq!(out, vec![Some(0.0), Some(200.0), Some(200.0), Some(150.0)]);
    }

    #[test]
    fn test_obv_empty() {
        assert!(obv(&[], &[]).is_empty());
    }
}
