use std::fmt;

/// Which side of the mount carries the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Backing files hold `signature ++ content`; the view shows `content`.
    #[default]
    Forward,
    /// Backing files hold `content`; the view shows `signature ++ content`.
    Reverse,
}

impl Mode {
    pub fn is_reverse(self) -> bool {
        self == Mode::Reverse
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Forward => write!(f, "forward"),
            Mode::Reverse => write!(f, "reverse"),
        }
    }
}
