pub mod form;

use seed::{prelude::*, *};
use serde::{Deserialize, de::DeserializeOwned};
use serde_wasm_bindgen::to_value;
use shared::{
    Coordinate, Endpoint, QueryCoalescer, Reaction, Transport, TransportError, TransportEvent,
};
use wasm_bindgen::{
    JsCast,
    prelude::{JsValue, wasm_bindgen},
};

use crate::form::WaypointForm;

#[wasm_bindgen(module = "/leaflet_map.js")]
extern "C" {
    #[wasm_bindgen(js_name = initMap)]
    fn init_map();
    #[wasm_bindgen(js_name = updateRoute)]
    fn update_route_js(coords: JsValue);
    #[wasm_bindgen(js_name = updateMarkers)]
    fn update_markers_js(markers: JsValue);
}

/// `host:port` of the routing server, overridable at build time.
fn route_server() -> Endpoint {
    option_env!("FRONTEND_ROUTE_SERVER")
        .and_then(parse_endpoint)
        .unwrap_or_default()
}

fn parse_endpoint(text: &str) -> Option<Endpoint> {
    let (host, port) = text.trim().rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    Some(Endpoint::new(host, port.parse().ok()?))
}

pub struct Model {
    form: WaypointForm,
    coalescer: QueryCoalescer,
    socket: Option<WebSocket>,
    route: Vec<Coordinate>,
    notice: Option<String>,
}

pub enum Msg {
    InputChanged(usize, String),
    InputCommitted(usize),
    RemoveInput(usize),
    AddInput,
    SwapInputs,
    MapClicked { lat: f64, lon: f64 },
    MarkerDragged { index: usize, lat: f64, lon: f64 },
    MarkerClicked(usize),
    SocketOpened,
    SocketMessage(Option<String>),
    SocketClosed,
    Reconnect,
}

#[derive(Deserialize)]
struct MapClickPayload {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct MarkerDragPayload {
    index: usize,
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct MarkerClickPayload {
    index: usize,
}

/// Opens sockets through seed so their callbacks come back as [`Msg`]s.
struct BrowserTransport<'a, O> {
    socket: &'a mut Option<WebSocket>,
    orders: &'a O,
}

impl<O: Orders<Msg>> Transport for BrowserTransport<'_, O> {
    fn open(&mut self, endpoint: &Endpoint) -> Result<(), TransportError> {
        let socket = WebSocket::builder(endpoint.url(), self.orders)
            .on_open(|| Msg::SocketOpened)
            .on_message(|message: WebSocketMessage| Msg::SocketMessage(message.text().ok()))
            .on_close(|_| Msg::SocketClosed)
            .build_and_open()
            .map_err(|err| TransportError::Unsupported(format!("{err:?}")))?;
        *self.socket = Some(socket);
        Ok(())
    }

    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotOpen)?;
        socket
            .send_text(text)
            .map_err(|err| TransportError::Send(format!("{err:?}")))
    }
}

fn custom_event_detail<T: DeserializeOwned>(event: web_sys::Event) -> Option<T> {
    let event = event.dyn_into::<web_sys::CustomEvent>().ok()?;
    serde_wasm_bindgen::from_value(event.detail()).ok()
}

pub fn init(_: Url, orders: &mut impl Orders<Msg>) -> Model {
    orders.stream(streams::window_event(Ev::from("map-click"), |event| {
        custom_event_detail::<MapClickPayload>(event)
            .map(|payload| Msg::MapClicked {
                lat: payload.lat,
                lon: payload.lon,
            })
    }));
    orders.stream(streams::window_event(Ev::from("marker-drag"), |event| {
        custom_event_detail::<MarkerDragPayload>(event).map(|payload| Msg::MarkerDragged {
            index: payload.index,
            lat: payload.lat,
            lon: payload.lon,
        })
    }));
    orders.stream(streams::window_event(Ev::from("marker-click"), |event| {
        custom_event_detail::<MarkerClickPayload>(event)
            .map(|payload| Msg::MarkerClicked(payload.index))
    }));

    let mut model = Model {
        form: WaypointForm::new(),
        coalescer: QueryCoalescer::new(),
        socket: None,
        route: Vec::new(),
        notice: None,
    };

    let mut transport = BrowserTransport {
        socket: &mut model.socket,
        orders: &*orders,
    };
    if let Err(err) = model.coalescer.connect(route_server(), &mut transport) {
        web_sys::console::error_1(&format!("[frontend] {err}").into());
        model.notice = Some("WebSocket not supported by your browser! Couldn't connect.".into());
    }

    sync_markers(&model.form);
    model
}

pub fn update(msg: Msg, model: &mut Model, orders: &mut impl Orders<Msg>) {
    match msg {
        Msg::InputChanged(index, text) => {
            model.form.edit(index, text);
            return;
        }
        Msg::InputCommitted(index) => {
            model.form.commit(index);
        }
        Msg::RemoveInput(index) => model.form.remove(index),
        Msg::AddInput => {
            model.form.insert();
        }
        Msg::SwapInputs => model.form.swap(),
        Msg::MapClicked { lat, lon } => {
            let index = model.form.place(Coordinate { lat, lon });
            web_sys::console::debug_1(
                &format!("[frontend] map click lat={lat:.5} lon={lon:.5} -> waypoint {index}")
                    .into(),
            );
        }
        Msg::MarkerDragged { index, lat, lon } => {
            model.form.drag(index, Coordinate { lat, lon });
        }
        Msg::MarkerClicked(index) => model.form.clear(index),
        Msg::SocketOpened => return handle_socket_event(TransportEvent::Opened, model, orders),
        Msg::SocketMessage(Some(text)) => {
            return handle_socket_event(TransportEvent::Message(text), model, orders);
        }
        Msg::SocketMessage(None) => {
            web_sys::console::debug_1(&"[frontend] ignoring binary frame".into());
            return;
        }
        Msg::SocketClosed => return handle_socket_event(TransportEvent::Closed, model, orders),
        Msg::Reconnect => {
            let mut transport = BrowserTransport {
                socket: &mut model.socket,
                orders: &*orders,
            };
            if let Err(err) = model.coalescer.reconnect(&mut transport) {
                web_sys::console::error_1(&format!("[frontend] {err}").into());
            }
            return;
        }
    }

    sync_markers(&model.form);
    submit(model, &*orders);
}

fn handle_socket_event(event: TransportEvent, model: &mut Model, orders: &mut impl Orders<Msg>) {
    let reaction = {
        let mut transport = BrowserTransport {
            socket: &mut model.socket,
            orders: &*orders,
        };
        model.coalescer.handle(event, &mut transport)
    };

    match reaction {
        Reaction::Connected => submit(model, &*orders),
        Reaction::Route(path) => {
            push_route_to_map(&path);
            model.route = path;
        }
        Reaction::ServerError(message) => {
            web_sys::console::log_1(&message.into());
        }
        Reaction::MalformedReply(err) => {
            web_sys::console::warn_1(&format!("[frontend] malformed reply: {err}").into());
        }
        Reaction::Reconnect { after } => {
            let delay = u32::try_from(after.as_millis()).unwrap_or(u32::MAX);
            orders.perform_cmd(cmds::timeout(delay, || Msg::Reconnect));
        }
        Reaction::Disconnected => {}
    }
}

fn submit(model: &mut Model, orders: &impl Orders<Msg>) {
    let mut transport = BrowserTransport {
        socket: &mut model.socket,
        orders,
    };
    let outcome = model.coalescer.submit(model.form.store(), &mut transport);
    web_sys::console::debug_1(&format!("[frontend] submit: {outcome:?}").into());
}

pub fn view(model: &Model) -> Node<Msg> {
    div![
        C!["waypoint-router"],
        view_inputs(&model.form),
        view_buttons(),
        if model.route.is_empty() {
            empty![]
        } else {
            small![C!["route-status"], format!("{} route points", model.route.len())]
        },
        if let Some(notice) = &model.notice {
            p![C!["notice"], notice]
        } else {
            empty![]
        }
    ]
}

fn view_inputs(form: &WaypointForm) -> Node<Msg> {
    let searchbars = form.inputs().iter().enumerate().map(|(index, text)| {
        div![
            C!["searchbar"],
            input![
                attrs! {
                    At::Value => text,
                    At::Placeholder => form.placeholder(index),
                    At::AutoComplete => "off",
                    At::SpellCheck => "false",
                },
                input_ev(Ev::Input, move |value| Msg::InputChanged(index, value)),
                ev(Ev::Change, move |_| Msg::InputCommitted(index)),
            ],
            a![
                C!["searchbar-clear"],
                attrs! { At::Href => "#" },
                "\u{00d7}",
                ev(Ev::Click, move |event| {
                    event.prevent_default();
                    Msg::RemoveInput(index)
                }),
            ]
        ]
    });

    div![C!["searchbars"], searchbars]
}

fn view_buttons() -> Node<Msg> {
    div![
        C!["inputbuttons"],
        a![
            C!["reversebars"],
            attrs! { At::Href => "#", At::Title => "Reverse route" },
            "\u{2191}\u{2193}",
            ev(Ev::Click, |event| {
                event.prevent_default();
                Msg::SwapInputs
            }),
        ],
        a![
            C!["addsearchbar"],
            attrs! { At::Href => "#", At::Title => "Add waypoint" },
            "+",
            ev(Ev::Click, |event| {
                event.prevent_default();
                Msg::AddInput
            }),
        ],
    ]
}

#[wasm_bindgen(start)]
pub fn start() {
    init_map();
    App::start("app", init, update, view);
}

fn push_route_to_map(path: &[Coordinate]) {
    if let Ok(value) = to_value(path) {
        update_route_js(value);
    }
}

fn sync_markers(form: &WaypointForm) {
    if let Ok(value) = to_value(&form.markers()) {
        update_markers_js(value);
    }
}
