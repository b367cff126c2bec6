use actix_web::HttpRequest;
use lazy_static::lazy_static;
use regex::Regex;
use std::net::IpAddr;
use std::str::FromStr;

// Extracting Actix header values is kinda convoluted.
// They check for an error in the header value not
// being convertable to string because of uh...
// invalid characters or something.
pub fn user_agent(req: &HttpRequest) -> String {
  req.headers().get("user-agent")
    .map(|h| String::from(h.to_str().unwrap_or("")))
    .unwrap_or(String::new())
}

// It's technically possible to get no IP address from
// the Actix ConnectionInfo. The view endpoint treats a
// missing address as an empty fingerprint component.
pub fn real_ip_addr(req: &HttpRequest) -> Option<IpAddr> {
  // The goal of the regex is to remove the port part
  // from the "IP address" that Actix gives us, which
  // may or may not have a port part.
  lazy_static! {
    static ref PORT_REGEX: Regex = Regex::new(
      r"(.+):\d+$"
    ).unwrap();
  }

  req.connection_info().realip_remote_addr()
    .map(|ip| {
      // Convert the result into an option:
      IpAddr::from_str(&PORT_REGEX.replace(ip, "$1"))
        .ok()
    })
    .unwrap_or(None)
}
