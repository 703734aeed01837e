//! Conversion between cube notation and the label stream the network predicts.
//!
//! A move such as `r2'` becomes `[Wide, R, Squared, Prime]`: the wide marker
//! precedes its face label and each modifier follows the move it modifies.

use std::fmt;

/// One output class of the speech network, excluding the CTC blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Wide,
    Prime,
    Squared,
    E,
    M,
    S,
    R,
    U,
    F,
    B,
    D,
    L,
    X,
    Y,
    Z,
}

/// Number of real labels.
pub const LABEL_COUNT: usize = 15;

/// Class index reserved for the CTC blank.
pub const BLANK_INDEX: usize = LABEL_COUNT;

/// Width of the network's output distribution.
pub const OUTPUT_CLASSES: usize = LABEL_COUNT + 1;

impl Label {
    /// All labels, ordered by class index.
    pub const ALL: [Label; LABEL_COUNT] = [
        Label::Wide,
        Label::Prime,
        Label::Squared,
        Label::E,
        Label::M,
        Label::S,
        Label::R,
        Label::U,
        Label::F,
        Label::B,
        Label::D,
        Label::L,
        Label::X,
        Label::Y,
        Label::Z,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns `None` for the blank index and anything out of range.
    pub fn from_index(index: usize) -> Option<Label> {
        Self::ALL.get(index).copied()
    }

    fn face(letter: char) -> Option<Label> {
        match letter {
            'R' => Some(Label::R),
            'U' => Some(Label::U),
            'F' => Some(Label::F),
            'B' => Some(Label::B),
            'D' => Some(Label::D),
            'L' => Some(Label::L),
            _ => None,
        }
    }

    /// The notation letter for move labels, `None` for modifiers.
    fn letter(self) -> Option<char> {
        match self {
            Label::Wide | Label::Prime | Label::Squared => None,
            Label::E => Some('E'),
            Label::M => Some('M'),
            Label::S => Some('S'),
            Label::R => Some('R'),
            Label::U => Some('U'),
            Label::F => Some('F'),
            Label::B => Some('B'),
            Label::D => Some('D'),
            Label::L => Some('L'),
            Label::X => Some('x'),
            Label::Y => Some('y'),
            Label::Z => Some('z'),
        }
    }

    fn is_face(self) -> bool {
        matches!(
            self,
            Label::R | Label::U | Label::F | Label::B | Label::D | Label::L
        )
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Wide => f.write_str("Wide"),
            Label::Prime => f.write_str("Prime"),
            Label::Squared => f.write_str("Squared"),
            other => match other.letter() {
                Some(c) => write!(f, "{c}"),
                None => Ok(()),
            },
        }
    }
}

/// Encode an algorithm string into labels.
///
/// Unrecognized move letters are skipped; their suffix characters are still
/// encoded.
pub fn encode(algorithm: &str) -> Vec<Label> {
    let mut labels = Vec::new();
    for token in algorithm.split_whitespace() {
        let mut chars = token.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        match first {
            'x' => labels.push(Label::X),
            'y' => labels.push(Label::Y),
            'z' => labels.push(Label::Z),
            'E' => labels.push(Label::E),
            'M' => labels.push(Label::M),
            'S' => labels.push(Label::S),
            'r' | 'u' | 'l' | 'd' | 'f' | 'b' => {
                labels.push(Label::Wide);
                labels.extend(Label::face(first.to_ascii_uppercase()));
            }
            other => labels.extend(Label::face(other)),
        }
        for suffix in chars {
            match suffix {
                '\'' => labels.push(Label::Prime),
                '2' => labels.push(Label::Squared),
                _ => {}
            }
        }
    }
    labels
}

/// Render labels back into an algorithm string.
///
/// A modifier with no preceding move is dropped.
pub fn decode(labels: &[Label]) -> String {
    let mut moves: Vec<String> = Vec::new();
    let mut wide = false;
    for &label in labels {
        match label {
            Label::Wide => {
                wide = true;
                continue;
            }
            Label::Prime | Label::Squared => {
                if let Some(last) = moves.last_mut() {
                    last.push(if label == Label::Prime { '\'' } else { '2' });
                }
            }
            face if face.is_face() => {
                let letter = face.letter().unwrap_or_default();
                let letter = if wide {
                    letter.to_ascii_lowercase()
                } else {
                    letter
                };
                moves.push(letter.to_string());
            }
            other => moves.extend(other.letter().map(String::from)),
        }
        wide = false;
    }
    moves.join(" ")
}

/// Label class indices for CTC training.
pub fn to_indices(labels: &[Label]) -> Vec<usize> {
    labels.iter().map(|l| l.index()).collect()
}

/// Labels for a decoded class path; the blank and unknown indices are dropped.
pub fn from_indices(indices: &[usize]) -> Vec<Label> {
    indices.iter().filter_map(|&i| Label::from_index(i)).collect()
}

/// Space-separated label names, used for diagnostic output.
pub fn format_labels(labels: &[Label]) -> String {
    labels
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
