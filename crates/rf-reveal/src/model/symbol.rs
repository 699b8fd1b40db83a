//! Grid symbols and the special-reel token

use serde::{Deserialize, Serialize};

/// A grid symbol as sent by the game service
///
/// Tokens the client does not know decode to [`Symbol::Empty`], the same
/// placeholder used before the first reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Symbol {
    // Line-bonus symbols
    Wild,
    Seven,
    GemRed,
    GemGreen,
    GemBlue,
    // Cascade symbols
    Zeus,
    Crown,
    Trident,
    Eagle,
    Vase,
    Fire,
    Gem,
    Sword,
    // Card ranks (both games)
    Ace,
    King,
    Queen,
    Jack,
    /// Counts across the grid, not positionally
    Scatter,
    /// Placeholder before the first reveal / unknown token
    #[default]
    Empty,
}

impl Symbol {
    /// Wire token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wild => "WILD",
            Self::Seven => "777",
            Self::GemRed => "GEM_RED",
            Self::GemGreen => "GEM_GREEN",
            Self::GemBlue => "GEM_BLUE",
            Self::Zeus => "ZEUS",
            Self::Crown => "CROWN",
            Self::Trident => "TRIDENT",
            Self::Eagle => "EAGLE",
            Self::Vase => "VASE",
            Self::Fire => "FIRE",
            Self::Gem => "GEM",
            Self::Sword => "SWORD",
            Self::Ace => "A",
            Self::King => "K",
            Self::Queen => "Q",
            Self::Jack => "J",
            Self::Scatter => "SCATTER",
            Self::Empty => "EMPTY",
        }
    }

    /// Parse a wire token; unknown tokens map to `Empty`
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_uppercase().as_str() {
            "WILD" => Self::Wild,
            "777" => Self::Seven,
            "GEM_RED" => Self::GemRed,
            "GEM_GREEN" => Self::GemGreen,
            "GEM_BLUE" => Self::GemBlue,
            "ZEUS" => Self::Zeus,
            "CROWN" => Self::Crown,
            "TRIDENT" => Self::Trident,
            "EAGLE" => Self::Eagle,
            "VASE" => Self::Vase,
            "FIRE" => Self::Fire,
            "GEM" => Self::Gem,
            "SWORD" => Self::Sword,
            "A" => Self::Ace,
            "K" => Self::King,
            "Q" => Self::Queen,
            "J" => Self::Jack,
            "SCATTER" => Self::Scatter,
            _ => Self::Empty,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_scatter(&self) -> bool {
        matches!(self, Self::Scatter)
    }
}

impl From<String> for Symbol {
    fn from(token: String) -> Self {
        Self::from_token(&token)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.as_str().to_string()
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token shown on the line-bonus special reel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SpecialSymbol {
    /// `Nx` multiplier applied to the line win
    Multiplier(u32),
    /// Triggers the fortune wheel
    Wheel,
    /// Anything the client cannot interpret
    Unknown,
}

impl SpecialSymbol {
    pub fn from_token(token: &str) -> Self {
        let token = token.trim();
        if token.eq_ignore_ascii_case("WHEEL") {
            return Self::Wheel;
        }
        token
            .strip_suffix(['x', 'X'])
            .and_then(|n| n.parse::<u32>().ok())
            .map(Self::Multiplier)
            .unwrap_or(Self::Unknown)
    }

    pub fn triggers_wheel(&self) -> bool {
        matches!(self, Self::Wheel)
    }
}

impl From<String> for SpecialSymbol {
    fn from(token: String) -> Self {
        Self::from_token(&token)
    }
}

impl From<SpecialSymbol> for String {
    fn from(symbol: SpecialSymbol) -> Self {
        symbol.to_string()
    }
}

impl std::fmt::Display for SpecialSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Multiplier(n) => write!(f, "{}x", n),
            Self::Wheel => f.write_str("WHEEL"),
            Self::Unknown => f.write_str("?"),
        }
    }
}
