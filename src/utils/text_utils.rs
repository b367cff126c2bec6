// Truncate a String to a maximum amount of characters.
// String::truncate can panic when cutting a multibyte
// unicode char in half, so we count chars instead.
pub fn truncate_utf8(value: &mut String, max_chars: usize) {
  if value.chars().count() > max_chars {
    *value = value.chars().take(max_chars).collect();
  }
}

// Minimal HTML escaping for user provided content that
// ends up in JSON responses and, eventually, web pages.
pub fn escape_html(value: &str) -> String {
  value
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncate_utf8_multibyte_does_not_panic() {
    let mut sut = String::from("héllo wörld");
    truncate_utf8(&mut sut, 4);
    assert_eq!(sut, "héll");
  }

  #[test]
  fn truncate_utf8_shorter_string_untouched() {
    let mut sut = String::from("short");
    truncate_utf8(&mut sut, 50);
    assert_eq!(sut, "short");
  }

  #[test]
  fn escape_html_tags() {
    assert_eq!(
      escape_html("<script>alert(\"x\")</script>"),
      "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"
    );
  }
}
