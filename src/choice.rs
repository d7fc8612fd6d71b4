//! # Weighted random choice.
//!
//! [`Choice`] pairs an item with a relative weight; [`pick`] draws one item so that
//! item `i` is returned with probability `w_i / Σw`.
//!
//! Used for action selection and for the profile's team/channel choices.
//!
//! ## Example
//! ```rust
//! use rand::{SeedableRng, rngs::StdRng};
//! use loadvisor::{Choice, pick};
//!
//! let choices = vec![Choice::new("post", 3), Choice::new("read", 1)];
//! let mut rng = StdRng::seed_from_u64(7);
//! let item = pick(&choices, &mut rng).unwrap();
//! assert!(*item == "post" || *item == "read");
//! ```

use rand::Rng;

use crate::error::SelectionError;

/// One weighted item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Choice<T> {
    /// Item returned when this choice wins the draw.
    pub item: T,
    /// Relative likelihood; zero never wins.
    pub weight: u32,
}

impl<T> Choice<T> {
    /// Creates a weighted choice.
    pub fn new(item: T, weight: u32) -> Self {
        Self { item, weight }
    }
}

/// Draws one item from `choices`.
///
/// Consumes exactly one `f64` from `rng` per successful draw.
///
/// ### Errors
/// - [`SelectionError::Empty`] when `choices` is empty;
/// - [`SelectionError::NonPositiveWeight`] when all weights are zero.
pub fn pick<'a, T, R>(choices: &'a [Choice<T>], rng: &mut R) -> Result<&'a T, SelectionError>
where
    R: Rng + ?Sized,
{
    if choices.is_empty() {
        return Err(SelectionError::Empty);
    }
    let total: u64 = choices.iter().map(|c| u64::from(c.weight)).sum();
    if total == 0 {
        return Err(SelectionError::NonPositiveWeight);
    }

    let mut target = rng.random::<f64>() * total as f64;
    for choice in choices.iter().filter(|c| c.weight > 0) {
        let weight = f64::from(choice.weight);
        if target < weight {
            return Ok(&choice.item);
        }
        target -= weight;
    }

    // Float rounding can leave `target` marginally past the last bucket.
    choices
        .iter()
        .rev()
        .find(|c| c.weight > 0)
        .map(|c| &c.item)
        .ok_or(SelectionError::NonPositiveWeight)
}
