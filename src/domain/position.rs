//! Holdings of a single instrument.

use super::candlestick::Candlestick;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub name: String,
    pub parts: f64,
    /// Latest candle seen for the instrument; valued at its close.
    pub part_value: Candlestick,
}

impl Position {
    pub fn new(name: impl Into<String>, part_value: Candlestick) -> Self {
        Position {
            name: name.into(),
            parts: 0.0,
            part_value,
        }
    }

    pub fn nav(&self) -> f64 {
        self.parts * self.part_value.close
    }

    pub fn is_empty(&self) -> bool {
        self.parts <= 0.0
    }

    pub fn update_value(&mut self, candle: Candlestick) {
        self.part_value = candle;
    }
}
