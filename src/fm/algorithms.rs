//! FM algorithms and routing structures
//!
//! Each of the 32 factory algorithms is a 6x6 modulation matrix plus a
//! carrier mask. `modulation[carrier][modulator]` is set when `modulator`
//! phase-modulates `carrier`. Operator indices are 0-based (0 = OP1), and
//! every edge goes from a higher to a lower index.

use super::constants::{NUM_ALGORITHMS, NUM_OPERATORS};

/// A feedback loop of the factory chart. Informational only; feedback depth
/// is not rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackLoop {
    /// Operator whose output is fed back
    pub source: usize,
    /// Operator receiving the fed-back signal
    pub destination: usize,
}

/// Operator routing of one algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    /// `modulation[carrier][modulator]`
    pub modulation: [[bool; NUM_OPERATORS]; NUM_OPERATORS],
    /// Operators summed into the audio output
    pub carriers: [bool; NUM_OPERATORS],
    /// Feedback loop of the factory chart, if any
    pub feedback: Option<FeedbackLoop>,
}

impl Topology {
    /// Creates a custom topology without feedback
    pub const fn new(
        modulation: [[bool; NUM_OPERATORS]; NUM_OPERATORS],
        carriers: [bool; NUM_OPERATORS],
    ) -> Self {
        Self {
            modulation,
            carriers,
            feedback: None,
        }
    }

    /// Returns the factory topology for a 0-based algorithm id
    #[inline]
    pub fn get(algorithm: u8) -> Option<&'static Topology> {
        ALGORITHMS.get(algorithm as usize)
    }

    /// Checks whether `modulator` phase-modulates `carrier`
    #[inline]
    pub fn modulates(&self, carrier: usize, modulator: usize) -> bool {
        self.modulation[carrier][modulator]
    }

    /// Checks if an operator contributes to the output
    #[inline]
    pub fn is_carrier(&self, op: usize) -> bool {
        self.carriers[op]
    }

    /// Number of carrier operators
    pub fn carrier_count(&self) -> usize {
        self.carriers.iter().filter(|&&c| c).count()
    }
}

const fn fb(source: usize, destination: usize) -> Option<FeedbackLoop> {
    Some(FeedbackLoop {
        source,
        destination,
    })
}

// Builds an algorithm from 1-based (modulator, carrier) edges and 1-based
// carrier numbers, so the table below reads like the factory charts.
const fn algorithm(
    edges: &[(usize, usize)],
    outputs: &[usize],
    feedback: Option<FeedbackLoop>,
) -> Topology {
    let mut modulation = [[false; NUM_OPERATORS]; NUM_OPERATORS];
    let mut i = 0;
    while i < edges.len() {
        let (modulator, carrier) = edges[i];
        modulation[carrier - 1][modulator - 1] = true;
        i += 1;
    }

    let mut carriers = [false; NUM_OPERATORS];
    let mut j = 0;
    while j < outputs.len() {
        carriers[outputs[j] - 1] = true;
        j += 1;
    }

    Topology {
        modulation,
        carriers,
        feedback,
    }
}

/// The 32 factory algorithms, indexed by 0-based algorithm id
#[rustfmt::skip]
pub static ALGORITHMS: [Topology; NUM_ALGORITHMS] = [
    algorithm(&[(2, 1), (4, 3), (5, 4), (6, 5)], &[1, 3], fb(5, 5)),                   // 1
    algorithm(&[(2, 1), (4, 3), (5, 4), (6, 5)], &[1, 3], fb(1, 1)),                   // 2
    algorithm(&[(2, 1), (3, 2), (5, 4), (6, 5)], &[1, 4], fb(5, 5)),                   // 3
    algorithm(&[(2, 1), (3, 2), (5, 4), (6, 5)], &[1, 4], fb(3, 5)),                   // 4
    algorithm(&[(2, 1), (4, 3), (6, 5)], &[1, 3, 5], fb(5, 5)),                        // 5
    algorithm(&[(2, 1), (4, 3), (6, 5)], &[1, 3, 5], fb(4, 5)),                        // 6
    algorithm(&[(2, 1), (4, 3), (5, 3), (6, 5)], &[1, 3], fb(5, 5)),                   // 7
    algorithm(&[(2, 1), (4, 3), (5, 3), (6, 5)], &[1, 3], fb(3, 3)),                   // 8
    algorithm(&[(2, 1), (4, 3), (5, 3), (6, 5)], &[1, 3], fb(1, 1)),                   // 9
    algorithm(&[(2, 1), (3, 2), (5, 4), (6, 4)], &[1, 4], fb(2, 2)),                   // 10
    algorithm(&[(2, 1), (3, 2), (5, 4), (6, 4)], &[1, 4], fb(5, 5)),                   // 11
    algorithm(&[(2, 1), (4, 3), (5, 3), (6, 3)], &[1, 3], fb(1, 1)),                   // 12
    algorithm(&[(2, 1), (4, 3), (5, 3), (6, 3)], &[1, 3], fb(5, 5)),                   // 13
    algorithm(&[(2, 1), (4, 3), (5, 4), (6, 4)], &[1, 3], fb(5, 5)),                   // 14
    algorithm(&[(2, 1), (4, 3), (5, 4), (6, 4)], &[1, 3], fb(1, 1)),                   // 15
    algorithm(&[(2, 1), (3, 1), (5, 1), (4, 3), (6, 5)], &[1], fb(5, 5)),              // 16
    algorithm(&[(2, 1), (3, 1), (5, 1), (4, 3), (6, 5)], &[1], fb(1, 1)),              // 17
    algorithm(&[(2, 1), (3, 1), (4, 1), (5, 4), (6, 5)], &[1], fb(2, 2)),              // 18
    algorithm(&[(2, 1), (3, 2), (6, 4), (6, 5)], &[1, 4, 5], fb(5, 5)),                // 19
    algorithm(&[(3, 1), (3, 2), (5, 4), (6, 4)], &[1, 2, 4], fb(2, 2)),                // 20
    algorithm(&[(3, 1), (3, 2), (6, 4), (6, 5)], &[1, 2, 4, 5], fb(2, 2)),             // 21
    algorithm(&[(2, 1), (6, 3), (6, 4), (6, 5)], &[1, 3, 4, 5], fb(5, 5)),             // 22
    algorithm(&[(3, 2), (6, 4), (6, 5)], &[1, 2, 4, 5], fb(5, 5)),                     // 23
    algorithm(&[(6, 3), (6, 4), (6, 5)], &[1, 2, 3, 4, 5], fb(5, 5)),                  // 24
    algorithm(&[(6, 4), (6, 5)], &[1, 2, 3, 4, 5], fb(5, 5)),                          // 25
    algorithm(&[(3, 2), (5, 4), (6, 4)], &[1, 2, 4], fb(5, 5)),                        // 26
    algorithm(&[(3, 2), (5, 4), (6, 4)], &[1, 2, 4], fb(2, 2)),                        // 27
    algorithm(&[(2, 1), (4, 3), (5, 4)], &[1, 3, 6], fb(4, 4)),                        // 28
    algorithm(&[(4, 3), (6, 5)], &[1, 2, 3, 5], fb(5, 5)),                             // 29
    algorithm(&[(4, 3), (5, 4)], &[1, 2, 3, 6], fb(4, 4)),                             // 30
    algorithm(&[(6, 5)], &[1, 2, 3, 4, 5], fb(5, 5)),                                  // 31
    algorithm(&[], &[1, 2, 3, 4, 5, 6], fb(5, 5)),                                     // 32
];
