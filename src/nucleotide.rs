/// One of the four bases counted by the pileup, in column order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Base {
    A,
    C,
    G,
    T,
}

pub const BASES: [Base; 4] = [Base::A, Base::C, Base::G, Base::T];

impl Base {
    #[inline(always)]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'A' => Some(Base::A),
            'C' => Some(Base::C),
            'G' => Some(Base::G),
            'T' | 'U' => Some(Base::T),
            _ => None,
        }
    }

    /// Position of this base in an A, C, G, T count array.
    #[inline(always)]
    pub fn index(self) -> usize {
        match self {
            Base::A => 0,
            Base::C => 1,
            Base::G => 2,
            Base::T => 3,
        }
    }

    #[inline(always)]
    pub fn complement(self) -> Self {
        match self {
            Base::A => Base::T,
            Base::C => Base::G,
            Base::G => Base::C,
            Base::T => Base::A,
        }
    }

    #[inline(always)]
    pub fn letter(self) -> char {
        match self {
            Base::A => 'A',
            Base::C => 'C',
            Base::G => 'G',
            Base::T => 'T',
        }
    }

    /// Complement of a reference letter. Letters outside ACGTU map to `N`.
    pub fn letter_complement(letter: char) -> char {
        Self::from_letter(letter)
            .map(|base| base.complement().letter())
            .unwrap_or('N')
    }
}

/// Upper-cases a nucleotide sequence and drops whitespace.
pub fn normalize_sequence(seq: &[u8]) -> String {
    seq.iter()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| char::from(c.to_ascii_uppercase()))
        .collect()
}
