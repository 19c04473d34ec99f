use super::window::RollingWindow;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DirectionalValues {
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub adx: Option<f64>,
}

/// Directional movement index (+DI, -DI, ADX).
///
/// +DM, -DM and true range are smoothed with a plain rolling mean over
/// `period` bars, and ADX is the rolling mean of DX over the same period.
/// This is a simplification of Wilder's recursive smoothing and gives
/// different numbers from textbook ADX; signal thresholds are tuned to it.
pub struct DirectionalMovementIndex {
    prev: Option<(f64, f64, f64)>,
    plus_dm: RollingWindow,
    minus_dm: RollingWindow,
    true_range: RollingWindow,
    dx: RollingWindow,
}

impl DirectionalMovementIndex {
    pub fn new(period: usize) -> Self {
        Self {
            prev: None,
            plus_dm: RollingWindow::new(period),
            minus_dm: RollingWindow::new(period),
            true_range: RollingWindow::new(period),
            dx: RollingWindow::new(period),
        }
    }

    pub fn next(&mut self, high: f64, low: f64, close: f64) -> DirectionalValues {
        // The first bar has no predecessor, so its movement is undefined.
        let movement = self.prev.map(|(prev_high, prev_low, prev_close)| {
            let up_move = high - prev_high;
            let down_move = prev_low - low;
            let plus_dm = if up_move > down_move && up_move > 0.0 {
                up_move
            } else {
                0.0
            };
            let minus_dm = if down_move > up_move && down_move > 0.0 {
                down_move
            } else {
                0.0
            };
            let tr = (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs());
            (plus_dm, minus_dm, tr)
        });
        self.prev = Some((high, low, close));

        self.plus_dm.push(movement.map(|m| m.0));
        self.minus_dm.push(movement.map(|m| m.1));
        self.true_range.push(movement.map(|m| m.2));

        let (plus_di, minus_di) = match (
            self.plus_dm.mean(),
            self.minus_dm.mean(),
            self.true_range.mean(),
        ) {
            (Some(plus), Some(minus), Some(tr)) if tr != 0.0 => {
                (Some(100.0 * plus / tr), Some(100.0 * minus / tr))
            }
            _ => (None, None),
        };

        let dx = match (plus_di, minus_di) {
            (Some(plus), Some(minus)) if plus + minus != 0.0 => {
                Some(100.0 * (plus - minus).abs() / (plus + minus))
            }
            _ => None,
        };

        DirectionalValues {
            plus_di,
            minus_di,
            adx: self.dx.next_mean(dx),
        }
    }
}
