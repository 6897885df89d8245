/// Size in bytes of the unit bitset
pub const UNIT_MAP_SIZE: usize = 32;

/// Bitset over the 256 unit ids selecting which of them a server accepts.
///
/// Servers treat the *absence* of a map as "accept all"; an explicit map
/// accepts exactly the units whose bit is set (broadcast is always accepted
/// when enabled, regardless of the map).
///
/// The textual form is a comma-separated list of single units and inclusive
/// ranges, e.g. `"1-10,32,40-47"`.
#[derive(Clone, PartialEq, Eq)]
pub struct UnitMap {
    bits: [u8; UNIT_MAP_SIZE],
}

impl UnitMap {
    /// A map with every unit disabled
    pub fn empty() -> UnitMap {
        UnitMap {
            bits: [0; UNIT_MAP_SIZE],
        }
    }

    /// Whether `unit` is enabled
    pub fn get(&self, unit: u8) -> bool {
        (self.bits[unit as usize / 8] & (1 << (unit % 8))) != 0
    }

    /// Enable or disable `unit`
    pub fn set(&mut self, unit: u8, enabled: bool) {
        let mask = 1 << (unit % 8);
        if enabled {
            self.bits[unit as usize / 8] |= mask;
        } else {
            self.bits[unit as usize / 8] &= !mask;
        }
    }

    /// Raw 32-byte bitset, unit 0 in the least significant bit of byte 0
    pub fn as_bytes(&self) -> &[u8; UNIT_MAP_SIZE] {
        &self.bits
    }

    /// Build from a raw 32-byte bitset
    pub fn from_bytes(bits: [u8; UNIT_MAP_SIZE]) -> UnitMap {
        UnitMap { bits }
    }

    /// Parse the textual range form, tolerating whitespace around numbers
    /// and separators. Malformed input yields `None` so the caller can keep
    /// its previous map.
    pub fn parse(text: &str) -> Option<UnitMap> {
        let mut map = UnitMap::empty();
        for part in text.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let (first, last) = match part.split_once('-') {
                Some((lo, hi)) => (
                    lo.trim().parse::<u8>().ok()?,
                    hi.trim().parse::<u8>().ok()?,
                ),
                None => {
                    let unit = part.parse::<u8>().ok()?;
                    (unit, unit)
                }
            };
            if first > last {
                return None;
            }
            for unit in first..=last {
                map.set(unit, true);
            }
        }
        Some(map)
    }
}

impl std::fmt::Display for UnitMap {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut first = true;
        let mut unit = 0usize;
        while unit < 256 {
            if self.get(unit as u8) {
                let start = unit;
                while unit + 1 < 256 && self.get((unit + 1) as u8) {
                    unit += 1;
                }
                if !first {
                    f.write_str(",")?;
                }
                first = false;
                if start == unit {
                    write!(f, "{start}")?;
                } else {
                    write!(f, "{start}-{unit}")?;
                }
            }
            unit += 1;
        }
        Ok(())
    }
}

impl std::fmt::Debug for UnitMap {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "UnitMap({self})")
    }
}

#[cfg(feature = "serialization")]
impl serde::Serialize for UnitMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serialization")]
impl<'de> serde::Deserialize<'de> for UnitMap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        UnitMap::parse(&text)
            .ok_or_else(|| serde::de::Error::custom("malformed unit range list"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_individual_units() {
        let mut map = UnitMap::empty();
        assert!(!map.get(7));
        map.set(7, true);
        map.set(255, true);
        assert!(map.get(7));
        assert!(map.get(255));
        assert!(!map.get(8));
        map.set(7, false);
        assert!(!map.get(7));
    }

    #[test]
    fn parses_ranges_and_single_units() {
        let map = UnitMap::parse("1-3, 10 ,200-202").unwrap();
        for unit in [1, 2, 3, 10, 200, 201, 202] {
            assert!(map.get(unit), "unit {unit}");
        }
        assert!(!map.get(0));
        assert!(!map.get(4));
        assert!(!map.get(199));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(UnitMap::parse("").is_none());
        assert!(UnitMap::parse("1,,3").is_none());
        assert!(UnitMap::parse("5-1").is_none());
        assert!(UnitMap::parse("300").is_none());
        assert!(UnitMap::parse("1-x").is_none());
    }

    #[test]
    fn textual_round_trip() {
        let text = "0,4-10,255";
        let map = UnitMap::parse(text).unwrap();
        assert_eq!(map.to_string(), text);
        assert_eq!(UnitMap::parse(&map.to_string()).unwrap(), map);
    }
}
