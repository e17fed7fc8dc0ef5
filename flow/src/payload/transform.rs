use rand::Rng;
use rand::seq::SliceRandom;

use crate::payload::Record;

/// One unit of work applied to a [`Record`] by `advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Uppercases every field.
    Uppercase,
    /// Lowercases every field.
    Lowercase,
    /// Reverses the order of the fields.
    ReverseFields,
    /// Moves the first field to the end.
    RotateFields,
    /// Uppercases the first character of every field and lowercases the rest.
    Capitalize,
}

impl Transform {
    pub const ALL: [Transform; 5] = [
        Transform::Uppercase,
        Transform::Lowercase,
        Transform::ReverseFields,
        Transform::RotateFields,
        Transform::Capitalize,
    ];

    /// Rolls between zero and `max` transforms, inclusive, picked uniformly from [`Transform::ALL`].
    pub fn roll<R: Rng>(rng: &mut R, max: usize) -> Vec<Transform> {
        let count = rng.gen_range(0..=max);

        (0..count)
            .filter_map(|_| Self::ALL.choose(rng).copied())
            .collect()
    }

    pub fn apply(self, mut record: Record) -> Record {
        let fields = record.fields_mut();

        match self {
            Transform::Uppercase => fields.iter_mut().for_each(|f| *f = f.to_uppercase()),
            Transform::Lowercase => fields.iter_mut().for_each(|f| *f = f.to_lowercase()),
            Transform::ReverseFields => fields.reverse(),
            Transform::RotateFields => {
                if !fields.is_empty() {
                    fields.rotate_left(1);
                }
            }
            Transform::Capitalize => fields.iter_mut().for_each(|f| *f = capitalize(f)),
        }

        record
    }
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();

    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
