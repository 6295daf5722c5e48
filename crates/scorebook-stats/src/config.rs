use serde::{Deserialize, Serialize};

/// Points awarded per result.
///
/// The league's ruleset is not fixed, so the weights are configuration.
/// Points are always recomputed from the win/draw/loss counters; they are
/// never accumulated on their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsConfig {
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            win: 2,
            draw: 1,
            loss: 0,
        }
    }
}

impl PointsConfig {
    pub fn points(&self, wins: u32, draws: u32, losses: u32) -> u64 {
        u64::from(wins) * u64::from(self.win)
            + u64::from(draws) * u64::from(self.draw)
            + u64::from(losses) * u64::from(self.loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_are_two_one_zero() {
        let c = PointsConfig::default();
        assert_eq!((c.win, c.draw, c.loss), (2, 1, 0));
        assert_eq!(c.points(3, 1, 2), 7);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let c: PointsConfig = serde_json::from_str(r#"{"win": 4}"#).unwrap();
        assert_eq!(c.win, 4);
        assert_eq!(c.draw, 1);
        assert_eq!(c.points(1, 1, 0), 5);
    }
}
