//! Multichannel layouts and their stereo-pair routing tables.
//!
//! `audiowmark` (and the embed/detect pipeline wrapping it) only knows how
//! to watermark a stereo pair at a time. Wider layouts are embedded and
//! detected one channel pair at a time, then merged back together.

use crate::error::AwmError;

/// A supported multichannel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Stereo,
    Surround51,
    Surround512,
    Surround71,
    Surround714,
    Surround916,
    /// Resolved from container metadata at runtime rather than specified
    /// up front.
    Auto,
}

/// A single channel pair to route through the external binary, given as
/// 0-indexed channel positions into the interleaved PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPair {
    pub index: usize,
    pub left: usize,
    pub right: usize,
}

impl ChannelLayout {
    /// Total channel count for this layout. `Auto` has no fixed count.
    pub fn channel_count(self) -> Option<usize> {
        match self {
            ChannelLayout::Stereo => Some(2),
            ChannelLayout::Surround51 => Some(6),
            ChannelLayout::Surround512 => Some(8),
            ChannelLayout::Surround71 => Some(8),
            ChannelLayout::Surround714 => Some(12),
            ChannelLayout::Surround916 => Some(16),
            ChannelLayout::Auto => None,
        }
    }

    /// The ordered list of channel pairs to route, front pairs first.
    ///
    /// `Auto` cannot be routed directly; callers must first resolve it to
    /// a concrete layout from container metadata (see
    /// [`crate::error::AwmError::AdmUnsupported`]).
    pub fn pairs(self) -> Result<Vec<ChannelPair>, AwmError> {
        let raw: &[(usize, usize)] = match self {
            ChannelLayout::Stereo => &[(0, 1)],
            ChannelLayout::Surround51 => &[(0, 1), (2, 3), (4, 5)],
            ChannelLayout::Surround512 => &[(0, 1), (2, 3), (4, 5), (6, 7)],
            ChannelLayout::Surround71 => &[(0, 1), (2, 3), (4, 5), (6, 7)],
            ChannelLayout::Surround714 => {
                &[(0, 1), (2, 3), (4, 5), (6, 7), (8, 9), (10, 11)]
            }
            ChannelLayout::Surround916 => &[
                (0, 1),
                (2, 3),
                (4, 5),
                (6, 7),
                (8, 9),
                (10, 11),
                (12, 13),
                (14, 15),
            ],
            ChannelLayout::Auto => return Err(AwmError::AdmUnsupported),
        };
        Ok(raw
            .iter()
            .enumerate()
            .map(|(index, &(left, right))| ChannelPair { index, left, right })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_has_one_pair() {
        let pairs = ChannelLayout::Stereo.pairs().unwrap();
        assert_eq!(pairs, vec![ChannelPair { index: 0, left: 0, right: 1 }]);
    }

    #[test]
    fn pair_count_matches_half_channel_count_for_fixed_layouts() {
        for layout in [
            ChannelLayout::Stereo,
            ChannelLayout::Surround51,
            ChannelLayout::Surround512,
            ChannelLayout::Surround71,
            ChannelLayout::Surround714,
            ChannelLayout::Surround916,
        ] {
            let pairs = layout.pairs().unwrap();
            let channels = layout.channel_count().unwrap();
            assert_eq!(pairs.len(), channels / 2);
        }
    }

    #[test]
    fn auto_cannot_be_routed_directly() {
        assert!(matches!(
            ChannelLayout::Auto.pairs(),
            Err(AwmError::AdmUnsupported)
        ));
    }

    #[test]
    fn pairs_are_indexed_in_front_to_back_order() {
        let pairs = ChannelLayout::Surround51.pairs().unwrap();
        for (i, pair) in pairs.iter().enumerate() {
            assert_eq!(pair.index, i);
        }
    }
}
