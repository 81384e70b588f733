use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use luz_calendar::{
    parse_shabbat_page, CalendarConfig, HttpTimeLookup, LookupError, StaticTimeLookup, TimeLookup,
};
use luz_expr::{TimeOfDay, Value};
use pretty_assertions::assert_eq;

fn t(h: u8, m: u8) -> TimeOfDay {
    TimeOfDay::new(h, m).unwrap()
}

/// A trimmed calendar page in the service's escaping: single quotes for JSON strings, doubled
/// backslashes, and a `ר\"ת` label.
fn sample_page(place: &str) -> String {
    let payload = format!(
        concat!(
            "{{'place':{{'name':'{place}','id':531}},",
            "'nextShabbat':{{'shabat_name':'נח','skiah':'18:02','times':[",
            "{{'name':'עלות השחר','value':'04:58'}},",
            "{{'name':'כניסת שבת','value':'17:44'}},",
            "{{'name':'צאת שבת','value':'18:41'}},",
            "{{'name':'צאת שבת ר\\\\'ת','value':'19:12'}},",
            "{{'name':'מספר','value':3}}",
            "]}}}}"
        ),
        place = place
    );
    format!(
        "<html><head><script>\nvar defaultData = JSON.parse('{payload}');\n</script></head></html>"
    )
}

#[test]
fn parses_times_and_seeds_a_name_table() {
    let times = parse_shabbat_page(&sample_page("חריש"), "חריש").unwrap();
    assert_eq!(times.portion, "נח");
    assert_eq!(times.entry, t(17, 44));
    assert_eq!(times.exit, t(18, 41));
    assert_eq!(times.rabbeinu_tam, t(19, 12));
    assert_eq!(times.sunset, t(18, 2));
    assert_eq!(times.times.len(), 5);

    let names = times.to_name_table();
    assert_eq!(names.get("parasha"), Some(&Value::from("נח")));
    assert_eq!(names.get("פרשה"), Some(&Value::from("נח")));
    assert_eq!(names.get("enter_time"), Some(&Value::Time(t(17, 44))));
    assert_eq!(names.get("כניסת_שבת"), Some(&Value::Time(t(17, 44))));
    assert_eq!(names.get("rabino_tam"), Some(&Value::Time(t(19, 12))));
    assert_eq!(names.get("רבינו_תם"), Some(&Value::Time(t(19, 12))));
    assert_eq!(names.get("שקיעה"), Some(&Value::Time(t(18, 2))));
    assert_eq!(names.get("עלות_השחר"), Some(&Value::Time(t(4, 58))));
    assert_eq!(names.get("מספר"), Some(&Value::Number(3)));
}

#[test]
fn a_different_place_in_the_payload_means_unknown_place() {
    let err = parse_shabbat_page(&sample_page("ירושלים"), "חריש").unwrap_err();
    assert!(err.is_place_not_found(), "got {err}");
    assert!(!err.is_retryable());
}

#[test]
fn missing_required_time_is_an_unexpected_response() {
    let page = sample_page("חריש").replace("'צאת שבת'", "'משהו אחר'");
    let err = parse_shabbat_page(&page, "חריש").unwrap_err();
    assert!(matches!(err, LookupError::UnexpectedResponse { .. }), "got {err}");
}

#[test]
fn static_lookup_distinguishes_unknown_places() {
    let times = parse_shabbat_page(&sample_page("חריש"), "חריש").unwrap();
    let lookup = StaticTimeLookup::new().with(times.clone());
    assert_eq!(lookup.lookup("חריש").unwrap(), times);
    assert!(lookup.lookup("חיפה").unwrap_err().is_place_not_found());
}

/// Serve exactly one HTTP response on a loopback port and hand back the request line.
fn serve_once(status: &str, body: String) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test http listener");
    let addr = listener.local_addr().expect("listener addr");
    let status = status.to_string();
    let handle = thread::spawn(move || {
        let (mut socket, _) = listener.accept().expect("accept");
        let mut buf = [0u8; 1024];
        let mut request = Vec::new();
        loop {
            let n = socket.read(&mut buf).expect("read request");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") || request.len() > 16 * 1024 {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = socket.write_all(response.as_bytes());
        let request = String::from_utf8_lossy(&request).to_string();
        request.lines().next().unwrap_or_default().to_string()
    });
    (format!("http://{addr}/calendar/shabatot"), handle)
}

fn lookup_for(base_url: String) -> HttpTimeLookup {
    HttpTimeLookup::new(CalendarConfig {
        base_url,
        timeout: Duration::from_secs(10),
        ..CalendarConfig::default()
    })
    .expect("build client")
}

#[test]
fn http_lookup_queries_by_place() {
    let (url, handle) = serve_once("200 OK", sample_page("חריש"));
    let times = lookup_for(url).lookup("חריש").unwrap();
    assert_eq!(times.entry, t(17, 44));

    let request_line = handle.join().expect("server thread");
    assert!(
        request_line.starts_with("GET /calendar/shabatot?place=%D7%97%D7%A8%D7%99%D7%A9 "),
        "unexpected request line: {request_line}"
    );
}

#[test]
fn http_error_status_is_a_retryable_service_failure() {
    let (url, handle) = serve_once("503 Service Unavailable", String::new());
    let err = lookup_for(url).lookup("חריש").unwrap_err();
    assert!(matches!(err, LookupError::Status { status: 503, .. }), "got {err}");
    assert!(err.is_retryable());
    assert!(!err.is_place_not_found());
    handle.join().expect("server thread");
}
