use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::canon;
use crate::component::{Component, ComponentMap};
use crate::error::{AddressError, TagError};
use crate::tagger::{AddressTagger, RuleTagger};

/// State and zip appended behind the city so the tagger always sees a
/// complete place trailer. Stripped again before reassembly.
pub const TRAILER_STATE: &str = "XX";
pub const TRAILER_ZIP: &str = "00000";

static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^()]*)\)?").unwrap());
static TRAILING_CI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\sCI$").unwrap());
static FOLDED_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[A-Z]$").unwrap());

// Retry rewrites, tried in order; the first match wins and is applied once.
static RUN_OF_THREE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)(?:-\d+){2,}\s+(.+)$").unwrap());
static RUN_OF_TWO: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)-\d+\s+(.+)$").unwrap());
static TRAILING_UNIT_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)\s+#?\d+[A-Z]?$").unwrap());
static TRAILING_UNIT_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)\s+[A-Z]$").unwrap());

/// A street address in canonical form.
///
/// `full_text` never carries the secondary unit; it is the join key every
/// source table is matched on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NormalizedAddress {
    full_text: String,
    street_number: String,
    street_name: String,
    occupancy: String,
    additional_info: String,
    canonical: bool,
}

impl NormalizedAddress {
    pub fn empty() -> Self {
        Self {
            full_text: String::new(),
            street_number: String::new(),
            street_name: String::new(),
            occupancy: String::new(),
            additional_info: String::new(),
            canonical: true,
        }
    }

    /// Build from already-canonical parts.
    pub fn from_parts(street_number: &str, street_name: &str, occupancy: &str) -> Self {
        Self {
            full_text: join_nonempty(&[street_number, street_name]),
            street_number: street_number.to_string(),
            street_name: street_name.to_string(),
            occupancy: occupancy.to_string(),
            additional_info: String::new(),
            canonical: true,
        }
    }

    /// The unparsed original, used as an opaque join key.
    fn fail_open(original: &str, additional_info: String) -> Self {
        Self {
            full_text: original.to_string(),
            street_number: String::new(),
            street_name: original.to_string(),
            occupancy: String::new(),
            additional_info,
            canonical: false,
        }
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn street_number(&self) -> &str {
        &self.street_number
    }

    pub fn street_name(&self) -> &str {
        &self.street_name
    }

    pub fn occupancy(&self) -> &str {
        &self.occupancy
    }

    pub fn additional_info(&self) -> &str {
        &self.additional_info
    }

    /// False when the tagger could not parse the input and the original
    /// text was kept as-is.
    pub fn is_canonical(&self) -> bool {
        self.canonical
    }

    pub fn is_empty(&self) -> bool {
        self.full_text.is_empty()
    }

    /// Key used for every address join. Zoning and other side tables reuse
    /// it verbatim.
    pub fn join_key(&self) -> &str {
        &self.full_text
    }
}

/// Address fields as a source table provides them.
///
/// Some departments publish one pre-concatenated column, others split the
/// number, suffix, street and apartment; either way `to_text` produces the
/// single string the normalizer consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAddress {
    pub number: String,
    pub suffix: String,
    pub street: String,
    pub apartment: String,
}

impl RawAddress {
    pub fn full(text: &str) -> Self {
        Self {
            street: text.to_string(),
            ..Default::default()
        }
    }

    pub fn to_text(&self) -> String {
        let number = self.number.trim();
        let suffix = self.suffix.trim();
        let mut parts: Vec<String> = Vec::new();

        if !number.is_empty() {
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_alphabetic()) {
                parts.push(format!("{number}{suffix}"));
            } else {
                parts.push(number.to_string());
                if !suffix.is_empty() {
                    parts.push(suffix.to_string());
                }
            }
        }

        let street = self.street.trim();
        if !street.is_empty() {
            parts.push(street.to_string());
        }

        let apartment = self.apartment.trim();
        if !apartment.is_empty() {
            let first = apartment.split_whitespace().next().unwrap_or("").to_uppercase();
            if apartment.starts_with('#') || canon::occupancy_marker(&first).is_some() {
                parts.push(apartment.to_string());
            } else {
                parts.push(format!("APT {apartment}"));
            }
        }

        parts.join(" ")
    }
}

/// Parses free-text street addresses into [`NormalizedAddress`].
pub struct Normalizer<T = RuleTagger> {
    tagger: T,
}

impl Normalizer<RuleTagger> {
    /// Normalizer backed by the bundled rule tagger, with `cities` as the
    /// place-name gazetteer.
    pub fn for_cities<I, S>(cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tagger = cities
            .into_iter()
            .fold(RuleTagger::new(), |t, city| t.with_place(city.as_ref()));
        Self::new(tagger)
    }
}

impl<T: AddressTagger> Normalizer<T> {
    pub fn new(tagger: T) -> Self {
        Self { tagger }
    }

    /// Normalize `raw` as an address in `city`.
    ///
    /// Ambiguous input fails open: the original text comes back with
    /// `is_canonical() == false`. Only data-quality violations are errors.
    pub fn normalize(&self, raw: &str, city: &str) -> Result<NormalizedAddress, AddressError> {
        let (street_text, additional_info) = strip_parenthetical(raw);
        let text = clean(&street_text);
        if text.is_empty() {
            return Ok(NormalizedAddress {
                additional_info,
                ..NormalizedAddress::empty()
            });
        }

        match self.tag_with_retry(&text, city) {
            Ok(map) => assemble(&map, raw, additional_info),
            Err(err) => {
                warn!("address left as-is: {err}");
                Ok(NormalizedAddress::fail_open(raw, additional_info))
            }
        }
    }

    /// Tag `text`; on ambiguity apply the first matching rewrite rule and
    /// try exactly once more.
    pub fn tag_with_retry(&self, text: &str, city: &str) -> Result<ComponentMap, TagError> {
        match self.tag_street(text, city) {
            Ok(map) => Ok(map),
            Err(err) => match retry_rewrite(text) {
                Some(rewritten) => {
                    debug!("retrying '{text}' as '{rewritten}'");
                    self.tag_street(&rewritten, city)
                }
                None => Err(err),
            },
        }
    }

    fn tag_street(&self, text: &str, city: &str) -> Result<ComponentMap, TagError> {
        let prepared = fix_tokens(text);
        let city = city.trim().to_uppercase();
        let anchored = join_nonempty(&[&prepared, &city, TRAILER_STATE, TRAILER_ZIP]);
        self.tagger.tag_anchored(&anchored, &city)
    }
}

/// Split `(…)` content out of the address. Returns the remaining text and
/// the parenthesised parts joined by a space.
pub fn strip_parenthetical(raw: &str) -> (String, String) {
    let info: Vec<String> = PARENTHETICAL
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .collect();
    let rest = PARENTHETICAL.replace_all(raw, " ");
    (rest.into_owned(), info.join(" "))
}

/// Uppercase, drop punctuation the tagger trips over, collapse whitespace.
fn clean(text: &str) -> String {
    text.to_uppercase()
        .replace('.', "")
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `... CI` -> `... CIR`; hyphens -> spaces.
fn fix_tokens(text: &str) -> String {
    let text = TRAILING_CI.replace(text, " CIR");
    text.replace('-', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn retry_rewrite(text: &str) -> Option<String> {
    if let Some(c) = RUN_OF_THREE.captures(text) {
        return Some(format!("{} {}", &c[1], &c[2]));
    }
    if let Some(c) = RUN_OF_TWO.captures(text) {
        return Some(format!("{} {}", &c[1], &c[2]));
    }
    if let Some(c) = TRAILING_UNIT_NUMBER.captures(text) {
        return Some(c[1].to_string());
    }
    if let Some(c) = TRAILING_UNIT_LETTER.captures(text) {
        return Some(c[1].to_string());
    }
    None
}

fn join_nonempty(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Default)]
struct Parts {
    number_prefix: String,
    number: String,
    number_suffix: String,
    folded_number: String,
    pre_directional: String,
    pre_modifier: String,
    pre_type: String,
    name: String,
    post_type: String,
    post_directional: String,
    post_modifier: String,
    occupancy_type: String,
    occupancy_id: String,
    subaddress: Vec<String>,
    building: String,
    recipient: String,
    po_box: Vec<String>,
}

fn assemble(map: &ComponentMap, input: &str, additional_info: String) -> Result<NormalizedAddress, AddressError> {
    let mut parts = Parts::default();

    for (label, value) in map.iter() {
        let component: Component = label.parse().map_err(|label| AddressError::UnknownComponent {
            label,
            input: input.to_string(),
        })?;
        let value = value.to_string();
        match component {
            Component::AddressNumberPrefix => parts.number_prefix = value,
            Component::AddressNumber => parts.number = value,
            Component::AddressNumberSuffix => parts.number_suffix = value,
            Component::StreetNamePreModifier => parts.pre_modifier = value,
            Component::StreetNamePreDirectional => {
                if FOLDED_NUMBER.is_match(&value) {
                    parts.folded_number = value;
                } else {
                    parts.pre_directional = canonical_directional(&value, input)?;
                }
            }
            Component::StreetNamePreType => parts.pre_type = value,
            Component::StreetName => parts.name = value,
            Component::StreetNamePostType => parts.post_type = canonical_street_type(&value, input)?,
            Component::StreetNamePostDirectional => {
                if FOLDED_NUMBER.is_match(&value) {
                    parts.folded_number = value;
                } else {
                    parts.post_directional = canonical_directional(&value, input)?;
                }
            }
            Component::StreetNamePostModifier => parts.post_modifier = value,
            Component::OccupancyType => {
                parts.occupancy_type = canon::occupancy_marker(&value).map(str::to_string).unwrap_or(value)
            }
            Component::OccupancyIdentifier => parts.occupancy_id = value,
            Component::SubaddressType | Component::SubaddressIdentifier => parts.subaddress.push(value),
            Component::BuildingName => parts.building = value,
            Component::Recipient => parts.recipient = value,
            Component::UspsBoxType | Component::UspsBoxId => parts.po_box.push(value),
            Component::PlaceName | Component::StateName | Component::ZipCode => {}
        }
    }

    if parts.name.is_empty() && !parts.recipient.is_empty() {
        split_recipient(&mut parts);
    }

    let mut street_number = parts.number.clone();
    if !parts.number_suffix.is_empty() {
        street_number = attach_suffix(&street_number, &parts.number_suffix);
    }
    if !parts.folded_number.is_empty() {
        street_number = format!("{street_number}-{}", parts.folded_number);
    }
    street_number = join_nonempty(&[&parts.number_prefix, &street_number]);

    let po_box = parts.po_box.join(" ");
    let name = if parts.name.is_empty() { po_box.as_str() } else { parts.name.as_str() };
    let street_name = join_nonempty(&[
        &parts.pre_directional,
        &parts.pre_modifier,
        &parts.pre_type,
        name,
        &parts.post_type,
        &parts.post_directional,
        &parts.post_modifier,
    ]);

    let occupancy = if parts.occupancy_type == "#" {
        format!("#{}", parts.occupancy_id)
    } else if !parts.occupancy_type.is_empty() || !parts.occupancy_id.is_empty() {
        join_nonempty(&[&parts.occupancy_type, &parts.occupancy_id])
    } else {
        parts.subaddress.join(" ")
    };

    Ok(NormalizedAddress {
        full_text: join_nonempty(&[&street_number, &street_name]),
        street_number,
        street_name,
        occupancy,
        additional_info: join_nonempty(&[&additional_info, &parts.building]),
        canonical: true,
    })
}

/// `Recipient` alone is the tagger's reading of a terse `NAME TYPE` input.
fn split_recipient(parts: &mut Parts) {
    let recipient = std::mem::take(&mut parts.recipient);
    if let Some((name, last)) = recipient.rsplit_once(' ') {
        if parts.post_type.is_empty() {
            if let Some(street_type) = canon::street_type(last) {
                parts.name = name.trim().to_string();
                parts.post_type = street_type.to_string();
                return;
            }
        }
    }
    parts.name = recipient;
}

fn attach_suffix(number: &str, suffix: &str) -> String {
    if suffix.contains('/') {
        format!("{number} {suffix}")
    } else if suffix.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{number}-{suffix}")
    } else {
        format!("{number}{suffix}")
    }
}

fn canonical_street_type(value: &str, input: &str) -> Result<String, AddressError> {
    canon::street_type(value)
        .map(str::to_string)
        .ok_or_else(|| AddressError::UnknownStreetType {
            value: value.to_string(),
            input: input.to_string(),
        })
}

fn canonical_directional(value: &str, input: &str) -> Result<String, AddressError> {
    canon::directional(value)
        .map(str::to_string)
        .ok_or_else(|| AddressError::UnknownDirectional {
            value: value.to_string(),
            input: input.to_string(),
        })
}
