//! Structured address search against a Nominatim endpoint.
//!
//! Only request building and response handling live here; the apps own the
//! HTTP client. The chosen place is turned into the same select event the
//! geocoding control emits, so both paths share one selection handler.

use formats::{AddressProperties, GeocodedFeature, SelectEvent};
use foundation::Millis;
use foundation::math::Coord;
use serde::Deserialize;
use surface::config::SearchSettings;
use surface::{MapContext, SelectionOutcome};
use tracing::debug;

use crate::query::SearchQuery;

/// Nominatim's usage policy asks for an identifying agent.
pub const USER_AGENT: &str = "para-de-minas-viewer/0.1";

/// Administrative area every search is pinned to.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchArea {
    pub endpoint: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub country_codes: String,
    pub limit: u32,
}

impl SearchArea {
    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            city: settings.city.clone(),
            state: settings.state.clone(),
            country: settings.country.clone(),
            country_codes: settings.country_codes.clone(),
            limit: settings.limit,
        }
    }
}

pub fn structured_search_url(query: &SearchQuery, area: &SearchArea) -> String {
    let limit = area.limit.to_string();
    let street = query.street_param();
    let params = [
        ("format", "json"),
        ("addressdetails", "1"),
        ("limit", limit.as_str()),
        ("countrycodes", area.country_codes.as_str()),
        ("city", area.city.as_str()),
        ("state", area.state.as_str()),
        ("country", area.country.as_str()),
        ("street", street.as_str()),
    ];
    let encoded: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect();
    format!("{}?{}", area.endpoint, encoded.join("&"))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlaceAddress {
    pub road: Option<String>,
    pub house_number: Option<String>,
    pub suburb: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    pub display_name: String,
    pub lat: String,
    pub lon: String,
    pub address: Option<PlaceAddress>,
}

impl Place {
    fn house_number(&self) -> Option<&str> {
        self.address
            .as_ref()
            .and_then(|a| a.house_number.as_deref())
            .filter(|n| !n.is_empty())
    }

    fn lon_lat(&self) -> Result<Coord, SearchError> {
        let parse = |raw: &str| {
            raw.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| SearchError::Decode(format!("invalid coordinate {raw:?}")))
        };
        Ok(Coord::new(parse(&self.lon)?, parse(&self.lat)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchError {
    /// The service answered but had nothing to offer.
    NotFound,
    Decode(String),
    Fetch(String),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::NotFound => write!(
                f,
                "Endereço não encontrado. Tente incluir o número da casa (exemplo: Rua São Paulo, 123)"
            ),
            SearchError::Decode(e) => write!(f, "Erro ao buscar endereço: resposta inválida ({e})"),
            SearchError::Fetch(e) => write!(f, "Erro ao buscar endereço: {e}"),
        }
    }
}

impl std::error::Error for SearchError {}

/// Something the user should know about an otherwise successful search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchNotice {
    HouseNumberNotFound { requested: String },
}

impl std::fmt::Display for SearchNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchNotice::HouseNumberNotFound { requested } => write!(
                f,
                "Atenção: Não foi possível encontrar exatamente o número {requested}. \
                 Mostrando a localização mais próxima encontrada."
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManualSearchHit {
    pub event: SelectEvent,
    pub notice: Option<SearchNotice>,
}

pub fn decode_places(body: &str) -> Result<Vec<Place>, SearchError> {
    serde_json::from_str(body).map_err(|e| SearchError::Decode(e.to_string()))
}

/// Orders places so the requested house number comes first, then anything
/// with a house number at all. Ties keep the service's order.
pub fn rank_places(places: &mut [Place], house_number: Option<&str>) {
    places.sort_by_key(|place| {
        let number = place.house_number();
        let exact = house_number.is_some() && number == house_number;
        (!exact, number.is_none())
    });
}

pub fn best_match(
    query: &SearchQuery,
    mut places: Vec<Place>,
) -> Result<ManualSearchHit, SearchError> {
    rank_places(&mut places, query.house_number.as_deref());
    let Some(place) = places.into_iter().next() else {
        return Err(SearchError::NotFound);
    };
    let coordinates = place.lon_lat()?;

    let notice = query.house_number.as_ref().and_then(|requested| {
        (place.house_number() != Some(requested.as_str())).then(|| {
            SearchNotice::HouseNumberNotFound {
                requested: requested.clone(),
            }
        })
    });

    let address = place.address.unwrap_or_default();
    let properties = AddressProperties {
        street: address.road.filter(|s| !s.is_empty()),
        housenumber: address.house_number.filter(|s| !s.is_empty()),
        neighborhood: address.suburb.filter(|s| !s.is_empty()),
        formatted: Some(place.display_name).filter(|s| !s.is_empty()),
        ..AddressProperties::default()
    };
    debug!(street = ?properties.street, notice = notice.is_some(), "manual search matched");

    Ok(ManualSearchHit {
        event: SelectEvent::with_feature(GeocodedFeature::new(coordinates, properties)),
        notice,
    })
}

/// Applies a finished search to the map. Returns the label of the placed
/// marker so the host can echo it in the search box; notices and failures
/// end up in the context's diagnostics as user notices.
pub fn apply_search(
    ctx: &mut MapContext,
    result: Result<ManualSearchHit, SearchError>,
    now: Millis,
) -> Option<String> {
    let hit = match result {
        Ok(hit) => hit,
        Err(err) => {
            ctx.notify("search", err.to_string(), now);
            return None;
        }
    };
    if let Some(notice) = &hit.notice {
        ctx.notify("search", notice.to_string(), now);
    }
    match ctx.select_address(&hit.event, now) {
        Ok(SelectionOutcome::Placed(marker)) => Some(marker.label),
        Ok(SelectionOutcome::Ignored) => None,
        Err(err) => {
            ctx.notify("search", err.to_string(), now);
            None
        }
    }
}
