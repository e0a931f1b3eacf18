//! Address component tagging.
//!
//! The normalizer only needs "string in, ordered component dictionary or
//! ambiguity out", so any parser can sit behind [`AddressTagger`]. The
//! bundled [`RuleTagger`] is a deterministic token walker tuned for
//! municipal street addresses.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::canon;
use crate::component::{Component, ComponentMap};
use crate::error::TagError;

pub trait AddressTagger {
    /// Split `text` into labelled components, in input order.
    fn tag(&self, text: &str) -> Result<ComponentMap, TagError>;

    /// Tag `text` when it is known to end in `place` followed by state and
    /// zip. Taggers without a gazetteer can ignore the hint.
    fn tag_anchored(&self, text: &str, _place: &str) -> Result<ComponentMap, TagError> {
        self.tag(text)
    }
}

impl<F> AddressTagger for F
where
    F: Fn(&str) -> Result<ComponentMap, TagError>,
{
    fn tag(&self, text: &str) -> Result<ComponentMap, TagError> {
        self(text)
    }
}

static HOUSE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[A-Z]?$").unwrap());
static NUMBER_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+[A-Z]?|\d+/\d+)$").unwrap());
static UNIT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+[A-Z]?|[A-Z]|[A-Z]\d+)$").unwrap());
static ZIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").unwrap());
static STATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").unwrap());

fn is_house_number(t: &str) -> bool {
    HOUSE_NUMBER.is_match(t)
}

fn is_occupancy_start(t: &str) -> bool {
    canon::occupancy_marker(t).is_some() || t.starts_with('#')
}

/// Deterministic tagger for US street addresses.
///
/// Place, state and zip are peeled off the right end first; place names come
/// from a small gazetteer (longest match wins) so multi-word towns such as
/// `NORTH ANDOVER` are never mistaken for a post-directional. Without a
/// gazetteer hit, whatever follows a complete street address is the place.
#[derive(Debug, Clone, Default)]
pub struct RuleTagger {
    places: Vec<Vec<String>>,
}

impl RuleTagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a place name for the gazetteer.
    pub fn with_place(mut self, name: &str) -> Self {
        let tokens: Vec<String> = name
            .split_whitespace()
            .map(|t| t.to_uppercase())
            .collect();
        if !tokens.is_empty() && !self.places.contains(&tokens) {
            self.places.push(tokens);
            self.places.sort_by(|a, b| b.len().cmp(&a.len()));
        }
        self
    }

    fn peel_place(&self, tokens: &[&str]) -> Option<usize> {
        self.places.iter().find_map(|place| {
            let len = place.len();
            if len > tokens.len() {
                return None;
            }
            let tail = &tokens[tokens.len() - len..];
            tail.iter()
                .zip(place)
                .all(|(t, p)| *t == p.as_str())
                .then_some(len)
        })
    }
}

/// Length of `place` if `tokens` ends with it.
fn peel_exact(tokens: &[&str], place: &str) -> Option<usize> {
    let place: Vec<&str> = place.split_whitespace().collect();
    let len = place.len();
    if len == 0 || len > tokens.len() {
        return None;
    }
    (tokens[tokens.len() - len..] == place[..]).then_some(len)
}

impl AddressTagger for RuleTagger {
    fn tag(&self, text: &str) -> Result<ComponentMap, TagError> {
        self.tag_with_anchor(text, None)
    }

    fn tag_anchored(&self, text: &str, place: &str) -> Result<ComponentMap, TagError> {
        self.tag_with_anchor(text, Some(place))
    }
}

impl RuleTagger {
    /// With an anchor, the known trailer place is peeled first so a longer
    /// gazetteer entry (`NORTH ANDOVER`) cannot swallow a post-directional.
    fn tag_with_anchor(&self, text: &str, anchor: Option<&str>) -> Result<ComponentMap, TagError> {
        let tokens: Vec<&str> = text
            .split_whitespace()
            .map(|t| t.trim_matches(','))
            .filter(|t| !t.is_empty())
            .collect();

        let mut end = tokens.len();
        let mut zip = None;
        let mut state = None;
        if end > 0 && ZIP.is_match(tokens[end - 1]) {
            zip = Some(tokens[end - 1]);
            end -= 1;
            if end > 0 && STATE.is_match(tokens[end - 1]) {
                state = Some(tokens[end - 1]);
                end -= 1;
            }
        }

        let mut place = None;
        if state.is_some() {
            let peeled = anchor
                .and_then(|a| peel_exact(&tokens[..end], a))
                .or_else(|| self.peel_place(&tokens[..end]));
            if let Some(len) = peeled {
                place = Some(tokens[end - len..end].join(" "));
                end -= len;
            }
        }

        let street = &tokens[..end];
        let open_tail = state.is_some() && place.is_none();
        let walk = StreetWalk::new(street, open_tail, text);
        let (mut map, consumed) = walk.run()?;

        let leftover = &street[consumed..];
        if let Some(first) = leftover.first() {
            if UNIT_ID.is_match(first) || is_house_number(first) {
                let label = if map.get(Component::OccupancyIdentifier.as_str()).is_some() {
                    Component::OccupancyIdentifier
                } else {
                    Component::AddressNumber
                };
                return Err(repeated(label, text));
            }
            if place.is_some() {
                return Err(repeated(Component::PlaceName, text));
            }
            place = Some(leftover.join(" "));
        }

        if let Some(place) = place {
            map.push(Component::PlaceName.as_str(), place);
        }
        if let Some(state) = state {
            map.push(Component::StateName.as_str(), state);
        }
        if let Some(zip) = zip {
            map.push(Component::ZipCode.as_str(), zip);
        }
        Ok(map)
    }
}

fn repeated(label: Component, input: &str) -> TagError {
    TagError::RepeatedLabel {
        label: label.as_str().to_string(),
        input: input.to_string(),
    }
}

/// Left-to-right walk over the street part of an address.
struct StreetWalk<'a> {
    tokens: &'a [&'a str],
    open_tail: bool,
    input: &'a str,
    map: ComponentMap,
    i: usize,
}

impl<'a> StreetWalk<'a> {
    fn new(tokens: &'a [&'a str], open_tail: bool, input: &'a str) -> Self {
        Self {
            tokens,
            open_tail,
            input,
            map: ComponentMap::new(),
            i: 0,
        }
    }

    fn peek(&self, k: usize) -> Option<&'a str> {
        self.tokens.get(k).copied()
    }

    fn take(&mut self, label: Component) {
        let token = self.tokens[self.i];
        self.map.push(label.as_str(), token);
        self.i += 1;
    }

    /// True if a street type at `k - 1` would end the street name.
    fn boundary(&self, k: usize) -> bool {
        let n = self.tokens.len();
        if k >= n {
            return true;
        }
        let t = self.tokens[k];
        if is_occupancy_start(t) {
            return true;
        }
        if k + 1 == n && UNIT_ID.is_match(t) {
            return true;
        }
        // Post-directional: last token, or followed by the occupancy
        if canon::directional(t).is_some() && self.peek(k + 1).map_or(true, is_occupancy_start) {
            return true;
        }
        self.open_tail
            && self.tokens[k..].iter().all(|t| {
                canon::street_type(t).is_none()
                    && !is_house_number(t)
                    && canon::occupancy_marker(t).is_none()
            })
    }

    fn run(mut self) -> Result<(ComponentMap, usize), TagError> {
        let n = self.tokens.len();

        if self.peek(0).is_some_and(is_house_number) {
            self.take(Component::AddressNumber);
            if self.i + 1 < n && NUMBER_SUFFIX.is_match(self.tokens[self.i]) {
                self.take(Component::AddressNumberSuffix);
            }
            if self.peek(self.i).is_some_and(is_house_number) {
                return Err(repeated(Component::AddressNumber, self.input));
            }
        }

        if let (Some(t), Some(next)) = (self.peek(self.i), self.peek(self.i + 1)) {
            let next_ends_street = canon::street_type(next).is_some() && self.boundary(self.i + 2);
            if canon::directional(t).is_some() && !next_ends_street && !is_occupancy_start(next) {
                self.take(Component::StreetNamePreDirectional);
            }
        }

        let name_start = self.i;
        while self.i < n {
            let t = self.tokens[self.i];
            if self.i > name_start {
                if is_occupancy_start(t) {
                    break;
                }
                if is_house_number(t) && canon::street_type(self.tokens[self.i - 1]).is_some() {
                    return Err(repeated(Component::AddressNumber, self.input));
                }
                if canon::street_type(t).is_some() && self.boundary(self.i + 1) {
                    self.take(Component::StreetNamePostType);
                    break;
                }
            }
            self.take(Component::StreetName);
        }

        if let Some(t) = self.peek(self.i) {
            let last_or_unit = self.peek(self.i + 1).map_or(true, is_occupancy_start);
            if canon::directional(t).is_some() && last_or_unit {
                self.take(Component::StreetNamePostDirectional);
            }
        }

        self.occupancy()?;
        Ok((self.map, self.i))
    }

    fn occupancy(&mut self) -> Result<(), TagError> {
        let n = self.tokens.len();
        let Some(t) = self.peek(self.i) else {
            return Ok(());
        };

        if canon::occupancy_marker(t).is_some() {
            self.take(Component::OccupancyType);
            if self.i >= n {
                return Ok(());
            }
            self.take(Component::OccupancyIdentifier);
            if self.open_tail {
                return Ok(());
            }
            while self.i < n {
                if is_house_number(self.tokens[self.i]) {
                    return Err(repeated(Component::OccupancyIdentifier, self.input));
                }
                self.take(Component::OccupancyIdentifier);
            }
        } else if t.starts_with('#') && t.len() > 1 {
            self.take(Component::OccupancyIdentifier);
        } else if self.i + 1 == n && UNIT_ID.is_match(t) {
            self.take(Component::OccupancyIdentifier);
        }
        Ok(())
    }
}
