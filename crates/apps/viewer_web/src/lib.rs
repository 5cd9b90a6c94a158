use console_error_panic_hook::set_once;
use gloo_net::http::Request;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::AbortController;

use formats::FeatureCollection;
use foundation::Millis;
use foundation::math::EPSG_4326;
use geocoding::{
    GeocoderControlOptions, SearchArea, SearchError, SearchQuery, apply_search, best_match,
    decode_places,
};
use layers::fetch::FetchError;
use surface::{MapContext, SelectionOutcome, ViewerConfig};

thread_local! {
    static CONTEXT: RefCell<Option<MapContext>> = const { RefCell::new(None) };
}

fn log(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}

fn warn(msg: &str) {
    web_sys::console::warn_1(&JsValue::from_str(msg));
}

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Same clock as `requestAnimationFrame` timestamps.
fn now() -> Millis {
    web_sys::window()
        .and_then(|w| w.performance())
        .map_or_else(|| Millis(js_sys::Date::now()), |p| Millis(p.now()))
}

/// Runs `f` against the live context. Calls arriving while another callback
/// holds the context are dropped.
fn with_context<R>(f: impl FnOnce(&mut MapContext) -> R) -> Result<R, JsValue> {
    CONTEXT.with(|cell| {
        let Ok(mut slot) = cell.try_borrow_mut() else {
            warn("viewer busy; dropping re-entrant call");
            return Err(JsValue::from_str("viewer busy"));
        };
        let ctx = slot
            .as_mut()
            .ok_or_else(|| JsValue::from_str("viewer not initialized; call init() first"))?;
        Ok(f(ctx))
    })
}

/// Aborts its request once `timeout_ms` elapses. Dropping it cancels the
/// timer.
struct Deadline {
    controller: AbortController,
    fired: Rc<Cell<bool>>,
    timer: Option<i32>,
    _on_expiry: Closure<dyn FnMut()>,
}

impl Deadline {
    fn start(timeout_ms: f64) -> Result<Self, FetchError> {
        let controller =
            AbortController::new().map_err(|e| FetchError::Network(format!("{e:?}")))?;
        let fired = Rc::new(Cell::new(false));

        let on_expiry: Closure<dyn FnMut()> = Closure::once({
            let controller = controller.clone();
            let fired = Rc::clone(&fired);
            move || {
                fired.set(true);
                controller.abort();
            }
        });
        let delay = timeout_ms.clamp(0.0, f64::from(i32::MAX)) as i32;
        let timer = web_sys::window().and_then(|w| {
            w.set_timeout_with_callback_and_timeout_and_arguments_0(
                on_expiry.as_ref().unchecked_ref(),
                delay,
            )
            .ok()
        });
        if timer.is_none() {
            warn("no timer available; request runs without a deadline");
        }

        Ok(Self {
            controller,
            fired,
            timer,
            _on_expiry: on_expiry,
        })
    }

    fn classify(&self, err: gloo_net::Error) -> FetchError {
        FetchError::from_failure(err.to_string(), self.fired.get())
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        if let (Some(timer), Some(window)) = (self.timer, web_sys::window()) {
            window.clear_timeout_with_handle(timer);
        }
    }
}

/// GETs `url` as text. Requests still pending after `timeout_ms`, body
/// included, fail with `FetchError::Timeout`.
async fn fetch_text(url: &str, timeout_ms: f64) -> Result<String, FetchError> {
    let deadline = Deadline::start(timeout_ms)?;
    let signal = deadline.controller.signal();
    let resp = Request::get(url)
        .abort_signal(Some(&signal))
        .send()
        .await
        .map_err(|e| deadline.classify(e))?;
    if !resp.ok() {
        return Err(FetchError::Status(resp.status()));
    }
    resp.text().await.map_err(|e| deadline.classify(e))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Bootstrap {
    style_url: String,
    attribution: String,
    geocoder: GeocoderControlOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewJson {
    center: [f64; 2],
    center_lon_lat: Option<[f64; 2]>,
    zoom: f64,
    resolution: f64,
    animating: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TooltipJson {
    visible: bool,
    html: Option<String>,
    position: Option<[f64; 2]>,
    offset: [f64; 2],
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Builds the map context from the page's config JSON and returns what the
/// page needs to mount the basemap and the geocoding control.
///
/// A missing API key or an unusable projection fails here, before anything
/// is drawn.
#[wasm_bindgen]
pub fn init(config_json: &str) -> Result<String, JsValue> {
    let config = ViewerConfig::from_json_str(config_json).map_err(js_err)?;
    let ctx = MapContext::new(config).map_err(js_err)?;

    let bootstrap = Bootstrap {
        style_url: ctx.surface().basemap.style_url.clone(),
        attribution: ctx.surface().basemap.attribution.clone(),
        geocoder: GeocoderControlOptions::from_config(ctx.config()),
    };
    let payload = serde_json::to_string(&bootstrap).map_err(js_err)?;

    CONTEXT.with(|cell| {
        let mut slot = cell
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("viewer busy"))?;
        *slot = Some(ctx);
        Ok::<(), JsValue>(())
    })?;
    log("viewer initialized");
    Ok(payload)
}

/// Handler for the geocoding control's `select` event. Returns true when a
/// marker was placed.
#[wasm_bindgen]
pub fn on_geocoder_select(payload: &str) -> Result<bool, JsValue> {
    let at = now();
    with_context(|ctx| ctx.dispatch_select(payload, at))?
        .map(|outcome| matches!(outcome, SelectionOutcome::Placed(_)))
        .map_err(js_err)
}

/// Search button / Enter in the search box. Resolves to the placed
/// marker's label, for the page to write back into the box, or `null` when
/// nothing was placed (blank input, no match, failure). Notices are left in
/// the diagnostics.
#[wasm_bindgen]
pub async fn search_address(text: String) -> Result<JsValue, JsValue> {
    let Some(query) = SearchQuery::parse(&text) else {
        return Ok(JsValue::NULL);
    };
    let (area, timeout_ms) = with_context(|ctx| {
        (
            SearchArea::from_settings(&ctx.config().search),
            ctx.config().fetch_timeout_ms,
        )
    })?;
    let url = geocoding::structured_search_url(&query, &area);

    let hit = fetch_text(&url, timeout_ms)
        .await
        .map_err(|e| SearchError::Fetch(e.to_string()))
        .and_then(|body| decode_places(&body))
        .and_then(|places| best_match(&query, places));

    let at = now();
    let label = with_context(|ctx| apply_search(ctx, hit, at))?;
    Ok(label.map_or(JsValue::NULL, |label| JsValue::from_str(&label)))
}

/// Fetches the overlay features; failures (including timeouts) leave the
/// overlay empty and are recorded as diagnostics.
#[wasm_bindgen]
pub fn load_overlay() -> Result<(), JsValue> {
    let (ticket, url, timeout_ms) = with_context(|ctx| {
        let (ticket, url) = ctx.begin_overlay_fetch();
        (ticket, url, ctx.config().fetch_timeout_ms)
    })?;
    spawn_local(async move {
        let result = fetch_text(&url, timeout_ms).await;
        let at = now();
        match with_context(|ctx| ctx.complete_overlay_fetch(ticket, result, at)) {
            Ok(Ok(count)) => log(&format!("overlay loaded: {count} features")),
            Ok(Err(err)) => warn(&format!("overlay unavailable: {err}")),
            Err(err) => warn(&format!("overlay result dropped: {err:?}")),
        }
    });
    Ok(())
}

#[wasm_bindgen]
pub fn basemap_loaded() -> Result<(), JsValue> {
    with_context(|ctx| ctx.basemap_loaded())
}

#[wasm_bindgen]
pub fn basemap_failed(reason: &str) -> Result<(), JsValue> {
    let at = now();
    with_context(|ctx| ctx.basemap_failed(reason, at))
}

#[wasm_bindgen]
pub fn geocoder_unavailable(reason: &str) -> Result<(), JsValue> {
    let at = now();
    with_context(|ctx| ctx.geocoder_unavailable(reason, at))
}

/// Drive from `requestAnimationFrame`; true when the view moved.
#[wasm_bindgen]
pub fn tick(now_ms: f64) -> Result<bool, JsValue> {
    with_context(|ctx| ctx.tick(Millis(now_ms)))
}

#[wasm_bindgen]
pub fn resize(width: f64, height: f64) -> Result<(), JsValue> {
    with_context(|ctx| ctx.resize([width, height]))
}

/// True when the tooltip changed and should be redrawn.
#[wasm_bindgen]
pub fn pointer_move(x: f64, y: f64) -> Result<bool, JsValue> {
    with_context(|ctx| ctx.pointer_move([x, y]))
}

#[wasm_bindgen]
pub fn pointer_leave() -> Result<bool, JsValue> {
    with_context(|ctx| ctx.surface_mut().on_pointer_leave())
}

#[wasm_bindgen]
pub fn viewport_json() -> Result<String, JsValue> {
    let view = with_context(|ctx| {
        let state = ctx.surface().viewport();
        ViewJson {
            center: state.center.as_array(),
            center_lon_lat: ctx
                .registry()
                .transform(ctx.surface().display_crs(), EPSG_4326, state.center)
                .ok()
                .map(|c| c.as_array()),
            zoom: state.zoom,
            resolution: state.resolution(),
            animating: ctx.surface().view().is_animating(),
        }
    })?;
    serde_json::to_string(&view).map_err(js_err)
}

/// Search marker as a display-system GeoJSON FeatureCollection.
#[wasm_bindgen]
pub fn marker_geojson() -> Result<String, JsValue> {
    with_context(|ctx| {
        FeatureCollection {
            features: ctx
                .surface()
                .markers
                .source
                .iter()
                .map(|m| m.to_feature())
                .collect(),
        }
        .to_geojson_value()
        .to_string()
    })
}

#[wasm_bindgen]
pub fn overlay_geojson() -> Result<String, JsValue> {
    with_context(|ctx| ctx.surface().overlay.features().to_geojson_value().to_string())
}

#[wasm_bindgen]
pub fn overlay_style_json() -> Result<String, JsValue> {
    let style = with_context(|ctx| ctx.surface().overlay.style.clone())?;
    serde_json::to_string(&style).map_err(js_err)
}

#[wasm_bindgen]
pub fn tooltip_json() -> Result<String, JsValue> {
    let tooltip = with_context(|ctx| {
        let view = ctx.surface().view();
        let t = &ctx.surface().tooltip;
        TooltipJson {
            visible: t.is_visible(),
            html: t.content().map(|c| c.html()),
            position: t.position().map(|p| view.coord_to_pixel(p)),
            offset: t.offset,
        }
    })?;
    serde_json::to_string(&tooltip).map_err(js_err)
}

/// Drains collected diagnostics; entries with severity `notice` are meant
/// for the user.
#[wasm_bindgen]
pub fn take_diagnostics() -> Result<String, JsValue> {
    let records = with_context(|ctx| ctx.diagnostics_mut().drain())?;
    serde_json::to_string(&records).map_err(js_err)
}
