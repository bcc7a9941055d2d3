//! CSI MasterFormat division taxonomy
//!
//! The current taxonomy is the 2004+ MasterFormat division list. Two
//! divisions from the 1995 edition are still emitted by generators and are
//! tracked here as obsolete:
//! - Division 15 (Mechanical): composite, now split across 21/22/23
//! - Division 16 (Electrical): renamed to 26
//!
//! The table is static configuration; it is never built from user input.

use std::collections::BTreeMap;

/// Current divisions (code, canonical name)
const CURRENT_DIVISIONS: &[(&str, &str)] = &[
    ("00", "Procurement and Contracting Requirements"),
    ("01", "General Requirements"),
    ("02", "Existing Conditions"),
    ("03", "Concrete"),
    ("04", "Masonry"),
    ("05", "Metals"),
    ("06", "Wood, Plastics, and Composites"),
    ("07", "Thermal and Moisture Protection"),
    ("08", "Openings"),
    ("09", "Finishes"),
    ("10", "Specialties"),
    ("11", "Equipment"),
    ("12", "Furnishings"),
    ("13", "Special Construction"),
    ("14", "Conveying Equipment"),
    ("21", "Fire Suppression"),
    ("22", "Plumbing"),
    ("23", "Heating, Ventilating, and Air Conditioning (HVAC)"),
    ("25", "Integrated Automation"),
    ("26", "Electrical"),
    ("27", "Communications"),
    ("28", "Electronic Safety and Security"),
    ("31", "Earthwork"),
    ("32", "Exterior Improvements"),
    ("33", "Utilities"),
    ("34", "Transportation"),
    ("35", "Waterway and Marine Construction"),
    ("40", "Process Interconnections"),
    ("41", "Material Processing and Handling Equipment"),
    ("42", "Process Heating, Cooling, and Drying Equipment"),
    ("43", "Process Gas and Liquid Handling, Purification, and Storage Equipment"),
    ("44", "Pollution and Waste Control Equipment"),
    ("45", "Industry-Specific Manufacturing Equipment"),
    ("46", "Water and Wastewater Equipment"),
    ("48", "Electrical Power Generation"),
];

/// Target divisions for splitting an obsolete composite division
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeSplit {
    /// Receives the fire-suppression share
    pub fire_suppression: String,
    /// Receives the plumbing share
    pub plumbing: String,
    /// Receives whatever is left, plus unclaimed items
    pub remainder: String,
}

impl CompositeSplit {
    /// All target codes, in allocation order
    pub fn targets(&self) -> [&str; 3] {
        [&self.fire_suppression, &self.plumbing, &self.remainder]
    }
}

/// How an obsolete division maps into the current taxonomy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObsoleteDivision {
    /// Historic bucket covering several current divisions
    Composite { name: String, split: CompositeSplit },
    /// Same scope under a new code
    Renamed { name: String, to: String },
}

impl ObsoleteDivision {
    pub fn name(&self) -> &str {
        match self {
            Self::Composite { name, .. } | Self::Renamed { name, .. } => name,
        }
    }
}

/// Classification of a (normalized) division code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeClass<'a> {
    Current,
    Obsolete(&'a ObsoleteDivision),
    Unknown,
}

/// Versioned division taxonomy
#[derive(Debug, Clone)]
pub struct Taxonomy {
    version: &'static str,
    current: BTreeMap<String, String>,
    obsolete: BTreeMap<String, ObsoleteDivision>,
}

impl Taxonomy {
    /// MasterFormat 2004 divisions, with the 1995 Mechanical/Electrical
    /// divisions registered as obsolete
    pub fn masterformat_2004() -> Self {
        let current = CURRENT_DIVISIONS
            .iter()
            .map(|(code, name)| (code.to_string(), name.to_string()))
            .collect();

        let mut obsolete = BTreeMap::new();
        obsolete.insert(
            "15".to_string(),
            ObsoleteDivision::Composite {
                name: "Mechanical".to_string(),
                split: CompositeSplit {
                    fire_suppression: "21".to_string(),
                    plumbing: "22".to_string(),
                    remainder: "23".to_string(),
                },
            },
        );
        obsolete.insert(
            "16".to_string(),
            ObsoleteDivision::Renamed {
                name: "Electrical".to_string(),
                to: "26".to_string(),
            },
        );

        Self {
            version: "MasterFormat 2004",
            current,
            obsolete,
        }
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn classify(&self, code: &str) -> CodeClass<'_> {
        if self.current.contains_key(code) {
            CodeClass::Current
        } else if let Some(obsolete) = self.obsolete.get(code) {
            CodeClass::Obsolete(obsolete)
        } else {
            CodeClass::Unknown
        }
    }

    pub fn is_current(&self, code: &str) -> bool {
        self.current.contains_key(code)
    }

    /// Canonical name for a current or obsolete code
    pub fn canonical_name(&self, code: &str) -> Option<&str> {
        self.current
            .get(code)
            .map(String::as_str)
            .or_else(|| self.obsolete.get(code).map(ObsoleteDivision::name))
    }

    /// Canonical name, falling back to `Division NN`
    pub fn display_name(&self, code: &str) -> String {
        self.canonical_name(code)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Division {}", code))
    }

    /// Normalize a generator-supplied division code to its two-digit form
    ///
    /// Takes the first run of ASCII digits: `"Division 22"` → `"22"`,
    /// `"22 00 00"` → `"22"`, `"230500"` → `"23"`, `"3"` → `"03"`.
    /// Returns `None` when the text contains no digits.
    pub fn normalize_code(raw: &str) -> Option<String> {
        let digits: String = raw
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();

        match digits.len() {
            0 => None,
            1 => Some(format!("0{}", digits)),
            _ => Some(digits[..2].to_string()),
        }
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::masterformat_2004()
    }
}
