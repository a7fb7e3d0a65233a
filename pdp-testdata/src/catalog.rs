// PDP Testdata - Attribute catalogs
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Fixed vocabularies the generator draws from.

use rand::Rng;

pub const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Amara", "Bruno", "Chen", "Clara", "Dmitri", "Elena", "Farah", "Gustavo",
    "Hana", "Ibrahim", "Ines", "Jonas", "Keiko", "Liam", "Lucia", "Mateo", "Nadia", "Omar",
    "Priya", "Quinn", "Rosa", "Samuel", "Tariq", "Uma", "Victor", "Wen", "Yara", "Zoe",
];

pub const LAST_NAMES: &[&str] = &[
    "Abbott", "Baker", "Castillo", "Dubois", "Eriksen", "Fischer", "Garcia", "Haddad", "Ivanova",
    "Jensen", "Kowalski", "Lindqvist", "Moreau", "Nakamura", "Okafor", "Petrov", "Quintero",
    "Rossi", "Schmidt", "Tanaka", "Umarov", "Vargas", "Weber", "Xu", "Yilmaz", "Zimmerman",
];

pub const EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "mail.test"];

pub const STREETS: &[&str] = &[
    "Maple", "Oak", "Cedar", "Pine", "Elm", "Willow", "Lakeview", "Hillcrest", "Sunset", "River",
];

pub const STREET_SUFFIXES: &[&str] = &["St", "Ave", "Rd", "Blvd", "Ln", "Way", "Ct"];

/// (city, state) pairs.
pub const CITIES: &[(&str, &str)] = &[
    ("Austin", "Texas"),
    ("Boston", "Massachusetts"),
    ("Chicago", "Illinois"),
    ("Denver", "Colorado"),
    ("Miami", "Florida"),
    ("Portland", "Oregon"),
    ("Phoenix", "Arizona"),
    ("Seattle", "Washington"),
    ("Atlanta", "Georgia"),
    ("Nashville", "Tennessee"),
    ("Columbus", "Ohio"),
    ("Sacramento", "California"),
];

pub const COUNTRIES: &[&str] = &[
    "United States", "Canada", "Mexico", "Brazil", "United Kingdom", "France", "Germany",
    "Spain", "India", "Japan", "Australia", "South Africa",
];

pub const COMPANY_STEMS: &[&str] = &[
    "Acme", "Blue Harbor", "Cobalt", "Evergreen", "Ironwood", "Lumen", "Northwind", "Pioneer",
    "Quantum", "Redstone", "Summit", "Vertex",
];

pub const COMPANY_SUFFIXES: &[&str] = &["Inc", "LLC", "Group", "Labs", "Systems", "Partners"];

pub const JOB_TITLES: &[&str] = &[
    "Accountant",
    "Data Analyst",
    "Civil Engineer",
    "Graphic Designer",
    "Nurse",
    "Product Manager",
    "Sales Representative",
    "Software Engineer",
    "Teacher",
    "Marketing Specialist",
    "Pharmacist",
    "Architect",
];

/// Base product names. Pools larger than this get numbered variants.
pub const PRODUCT_NAMES: &[&str] = &[
    "Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta", "Eta", "Theta", "Iota", "Kappa",
    "Lambda", "Mu", "Nu", "Xi", "Omicron", "Pi", "Rho", "Sigma", "Tau", "Upsilon", "Phi", "Chi",
    "Psi", "Omega",
];

/// A device/os/browser combination with the browser versions it ships.
#[derive(Debug, Clone, Copy)]
pub struct Platform {
    pub device: &'static str,
    pub os: &'static str,
    pub browser: &'static str,
    pub versions: &'static [&'static str],
}

impl Platform {
    /// `{browser}/{version} ({os}; {device})`
    pub fn user_agent(&self, version: &str) -> String {
        format!("{}/{} ({}; {})", self.browser, version, self.os, self.device)
    }
}

pub const PLATFORMS: &[Platform] = &[
    Platform {
        device: "Desktop",
        os: "Windows 11",
        browser: "Chrome",
        versions: &["120.0", "121.0", "122.0"],
    },
    Platform {
        device: "Desktop",
        os: "Windows 10",
        browser: "Edge",
        versions: &["119.0", "120.0"],
    },
    Platform {
        device: "Desktop",
        os: "macOS 14",
        browser: "Safari",
        versions: &["17.1", "17.2"],
    },
    Platform {
        device: "Desktop",
        os: "Linux",
        browser: "Firefox",
        versions: &["120.0", "121.0"],
    },
    Platform {
        device: "Mobile",
        os: "iOS 17",
        browser: "Safari",
        versions: &["17.1", "17.2"],
    },
    Platform {
        device: "Mobile",
        os: "Android 14",
        browser: "Chrome",
        versions: &["120.0", "121.0"],
    },
    Platform {
        device: "Tablet",
        os: "iPadOS 17",
        browser: "Safari",
        versions: &["17.2"],
    },
    Platform {
        device: "Tablet",
        os: "Android 13",
        browser: "Firefox",
        versions: &["121.0"],
    },
];

/// Unique product name for a pool index.
pub fn product_name(index: usize) -> String {
    let base = PRODUCT_NAMES[index % PRODUCT_NAMES.len()];
    match index / PRODUCT_NAMES.len() {
        0 => base.to_string(),
        round => format!("{} {}", base, round + 1),
    }
}

/// Pick one entry. Catalogs are never empty.
pub fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}
