//! Typesetting modes, as queried by `\ifvmode`, `\ifhmode`, `\ifmmode` and `\ifinner`.
//!
//! The expander doesn't build lists and so doesn't know the current mode.
//! It asks a [ModeOracle] provided by whoever is consuming the expanded stream.

/// A TeX mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    #[default]
    Vertical,
    InternalVertical,
    Horizontal,
    RestrictedHorizontal,
    Math,
    DisplayMath,
}

impl Mode {
    pub fn is_vertical(&self) -> bool {
        matches!(self, Mode::Vertical | Mode::InternalVertical)
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, Mode::Horizontal | Mode::RestrictedHorizontal)
    }

    pub fn is_math(&self) -> bool {
        matches!(self, Mode::Math | Mode::DisplayMath)
    }

    /// Internal modes are the modes entered inside boxes and inline math.
    pub fn is_inner(&self) -> bool {
        matches!(
            self,
            Mode::InternalVertical | Mode::RestrictedHorizontal | Mode::Math
        )
    }
}

/// Source of the current mode.
pub trait ModeOracle {
    fn mode(&self) -> Mode;
}

/// An oracle that always reports the same mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedMode(pub Mode);

impl ModeOracle for FixedMode {
    fn mode(&self) -> Mode {
        self.0
    }
}

impl<F: Fn() -> Mode> ModeOracle for F {
    fn mode(&self) -> Mode {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_classes() {
        assert!(Mode::InternalVertical.is_vertical());
        assert!(Mode::InternalVertical.is_inner());
        assert!(!Mode::Vertical.is_inner());
        assert!(Mode::DisplayMath.is_math());
        assert!(!Mode::DisplayMath.is_inner());
        assert!(Mode::RestrictedHorizontal.is_horizontal());
    }

    #[test]
    fn closure_oracle() {
        let oracle = || Mode::Horizontal;
        assert_eq!(ModeOracle::mode(&oracle), Mode::Horizontal);
        assert_eq!(FixedMode::default().mode(), Mode::Vertical);
    }
}
