//! Band plan and one-touch band presets

use super::types::Frequency;

/// US amateur radio bands (FCC Part 97) as (low_hz, high_hz) pairs.
/// Only frequencies within these bands are accepted.
const AMATEUR_BANDS_HZ: &[(u64, u64)] = &[
    (1_800_000, 2_000_000),       // 160m
    (3_500_000, 4_000_000),       // 80m
    (5_332_000, 5_405_000),       // 60m
    (7_000_000, 7_300_000),       // 40m
    (10_100_000, 10_150_000),     // 30m
    (14_000_000, 14_350_000),     // 20m
    (18_068_000, 18_168_000),     // 17m
    (21_000_000, 21_450_000),     // 15m
    (24_890_000, 24_990_000),     // 12m
    (28_000_000, 29_700_000),     // 10m
    (50_000_000, 54_000_000),     // 6m
    (144_000_000, 148_000_000),   // 2m
    (420_000_000, 450_000_000),   // 70cm
];

/// Check if a frequency falls within a US amateur band.
pub fn is_amateur_frequency(hz: u64) -> bool {
    AMATEUR_BANDS_HZ.iter().any(|&(lo, hi)| hz >= lo && hz <= hi)
}

/// Which row of preset buttons a preset belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetKind {
    Cw,
    Ssb,
}

/// A frequency/mode pair tuned by one button press
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPreset {
    pub kind: PresetKind,
    pub band: &'static str,
    pub freq_hz: f64,
    pub mode: &'static str,
}

impl BandPreset {
    pub fn frequency(&self) -> Frequency {
        Frequency::hz(self.freq_hz)
    }
}

const fn preset(kind: PresetKind, band: &'static str, freq_hz: f64, mode: &'static str) -> BandPreset {
    BandPreset {
        kind,
        band,
        freq_hz,
        mode,
    }
}

/// Bottom-of-band CW and popular SSB calling spots
pub const BAND_PRESETS: &[BandPreset] = &[
    preset(PresetKind::Cw, "10m", 28_000_000.0, "CW"),
    preset(PresetKind::Cw, "12m", 24_900_000.0, "CW"),
    preset(PresetKind::Cw, "15m", 21_000_000.0, "CW"),
    preset(PresetKind::Cw, "20m", 14_000_000.0, "CW"),
    preset(PresetKind::Cw, "40m", 7_000_000.0, "CW"),
    preset(PresetKind::Ssb, "10m", 28_300_000.0, "USB"),
    preset(PresetKind::Ssb, "12m", 24_952_000.0, "USB"),
    preset(PresetKind::Ssb, "15m", 21_200_000.0, "USB"),
    preset(PresetKind::Ssb, "20m", 14_150_000.0, "USB"),
    preset(PresetKind::Ssb, "40m", 7_125_000.0, "LSB"),
];

/// Look up a preset by row and band label (case-insensitive)
pub fn find_preset(kind: PresetKind, band: &str) -> Option<&'static BandPreset> {
    BAND_PRESETS
        .iter()
        .find(|p| p.kind == kind && p.band.eq_ignore_ascii_case(band.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_amateur() {
        // Broadcast AM (1 MHz)
        assert!(!is_amateur_frequency(1_000_000));
        assert!(!is_amateur_frequency(0));
        // Between 30m and 20m
        assert!(!is_amateur_frequency(10_000_000));
    }

    #[test]
    fn band_edges_are_inclusive() {
        assert!(is_amateur_frequency(1_800_000));
        assert!(is_amateur_frequency(29_700_000));
        assert!(is_amateur_frequency(420_000_000));
    }

    #[test]
    fn every_preset_is_in_band() {
        for p in BAND_PRESETS {
            assert!(
                is_amateur_frequency(p.freq_hz as u64),
                "preset {:?} {} out of band",
                p.kind,
                p.band
            );
        }
    }

    #[test]
    fn forty_meter_ssb_is_lsb() {
        let p = find_preset(PresetKind::Ssb, "40M").unwrap();
        assert_eq!(p.mode, "LSB");
        assert_eq!(p.freq_hz, 7_125_000.0);
    }

    #[test]
    fn unknown_band_is_none() {
        assert!(find_preset(PresetKind::Cw, "6m").is_none());
    }
}
