//! Address lookup outside the map: the typed-in search box and the options
//! handed to the embedded geocoding control.

pub mod control;
pub mod nominatim;
pub mod query;

pub use control::GeocoderControlOptions;
pub use nominatim::{
    ManualSearchHit, Place, PlaceAddress, SearchArea, SearchError, SearchNotice, USER_AGENT,
    apply_search, best_match, decode_places, rank_places, structured_search_url,
};
pub use query::SearchQuery;
