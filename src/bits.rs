use std::fmt;

/// Bit `i` of `word` as 0 or 1. Bits beyond the word width read as 0.
#[inline]
pub fn bit(word: u32, i: u32) -> u32 {
    word.checked_shr(i).map_or(0, |w| w & 1)
}

/// One sample of the packed device outputs (`uo_out`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct OutWord(pub u32);

impl OutWord {
    pub fn bit(self, i: u32) -> u32 {
        bit(self.0, i)
    }

    pub fn get(self, out: OutBit) -> u32 {
        self.bit(out.index())
    }
}

/// Named bits of `uo_out`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutBit {
    Spike,
    Refractory,
}

impl OutBit {
    pub const fn index(self) -> u32 {
        match self {
            OutBit::Spike => 0,
            OutBit::Refractory => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            OutBit::Spike => "spike",
            OutBit::Refractory => "refractory",
        }
    }
}

impl fmt::Display for OutBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (uo_out[{}])", self.name(), self.index())
    }
}
