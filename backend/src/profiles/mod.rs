//! Registry of company profiles.
//!
//! Each profile maps a short id (`ngtl`, `alliance`, ...) to the company name
//! used in the extracts, the commodity it carries and the dashboard sections
//! built for it.

use serde::Serialize;

use crate::models::Commodity;

/// Dashboard sections enabled for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sections {
    pub traffic: bool,
    pub apportion: bool,
    pub safety: bool,
    pub tolls: bool,
}

impl Sections {
    const fn new(traffic: bool, apportion: bool, tolls: bool) -> Self {
        Self {
            traffic,
            apportion,
            safety: true,
            tolls,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: &'static str,
    pub company: &'static str,
    pub commodity: Commodity,
    pub sections: Sections,
    /// Key point shown first on the traffic dashboard
    pub default_point: Option<&'static str>,
    /// Name of the pipeline in the tolls extract
    pub tolls_pipeline: Option<&'static str>,
}

const fn gas(id: &'static str, company: &'static str, sections: Sections) -> Profile {
    Profile {
        id,
        company,
        commodity: Commodity::Gas,
        sections,
        default_point: None,
        tolls_pipeline: None,
    }
}

const fn oil(id: &'static str, company: &'static str, sections: Sections) -> Profile {
    Profile {
        id,
        company,
        commodity: Commodity::Oil,
        sections,
        default_point: None,
        tolls_pipeline: None,
    }
}

const TRAFFIC: Sections = Sections::new(true, false, false);
const TRAFFIC_APPORTION: Sections = Sections::new(true, true, false);
const SAFETY_ONLY: Sections = Sections::new(false, false, false);

/// Every known profile, in dashboard order.
pub const PROFILES: &[Profile] = &[
    Profile {
        default_point: Some("32"),
        ..gas("ngtl", "NOVA Gas Transmission Ltd.", TRAFFIC)
    },
    Profile {
        tolls_pipeline: Some("Alliance"),
        ..gas("alliance", "Alliance Pipeline Ltd.", Sections::new(true, false, true))
    },
    gas("tcpl", "TransCanada PipeLines Limited", TRAFFIC),
    Profile {
        tolls_pipeline: Some("Westcoast"),
        ..gas("westcoast", "Westcoast Energy Inc.", TRAFFIC)
    },
    gas("emera_brunswick", "Emera Brunswick Pipeline Company Ltd.", SAFETY_ONLY),
    gas("maritimes_northeast", "Maritimes & Northeast Pipeline Management Ltd.", TRAFFIC),
    gas("many_islands", "Many Islands Pipe Lines (Canada) Limited", SAFETY_ONLY),
    gas("tqm", "Trans Quebec and Maritimes Pipeline Inc.", TRAFFIC),
    gas("vector", "Vector Pipeline Limited Partnership", SAFETY_ONLY),
    gas("foothills", "Foothills Pipe Lines Ltd.", TRAFFIC),
    oil("enbridge_mainline", "Enbridge Pipelines Inc.", TRAFFIC_APPORTION),
    oil("keystone", "TransCanada Keystone Pipeline GP Ltd.", TRAFFIC_APPORTION),
    oil("trans_mountain", "Trans Mountain Pipeline ULC", TRAFFIC_APPORTION),
    oil("cochin", "PKM Cochin ULC", TRAFFIC_APPORTION),
    oil("southern_lights", "Enbridge Southern Lights GP Inc.", SAFETY_ONLY),
    oil("bakken", "Enbridge Bakken Pipeline Company Inc.", SAFETY_ONLY),
    oil("norman_wells", "Enbridge Pipelines (NW) Inc.", TRAFFIC_APPORTION),
    oil("express_pipeline", "Express Pipeline Ltd.", SAFETY_ONLY),
    oil("trans_northern", "Trans-Northern Pipelines Inc.", TRAFFIC),
    oil("genesis", "Genesis Pipeline Canada Ltd.", SAFETY_ONLY),
    oil("montreal", "Montreal Pipe Line Limited", SAFETY_ONLY),
    oil("westspur", "Westspur Pipeline Company", SAFETY_ONLY),
    oil("aurora", "Aurora Pipeline Company Ltd.", SAFETY_ONLY),
    oil("milk_river", "Plains Midstream Canada ULC", SAFETY_ONLY),
    oil("wascana", "Wascana Pipeline Ltd.", SAFETY_ONLY),
];

/// Profile by short id (`ngtl`).
pub fn find(id: &str) -> Option<&'static Profile> {
    PROFILES.iter().find(|p| p.id == id)
}

/// Profile by exact company name.
pub fn find_by_company(company: &str) -> Option<&'static Profile> {
    PROFILES.iter().find(|p| p.company == company)
}
