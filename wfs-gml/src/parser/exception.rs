//! Détection des rapports d'exception OWS
//!
//! Le service peut répondre HTTP 200 avec un `ows:ExceptionReport` dans le corps :
//! la détection se fait donc sur le contenu, pas sur le statut HTTP.

use memchr::memmem;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Taille de l'en-tête inspecté pour reconnaître un rapport d'exception
const SNIFF_LEN: usize = 2048;

/// Retourne le message d'exception si `data` est un rapport d'exception OWS/WFS.
///
/// Couvre `ExceptionReport`, `ows:ExceptionReport` et `ServiceExceptionReport`.
pub fn detect_exception(data: &[u8]) -> Option<String> {
    let head = &data[..data.len().min(SNIFF_LEN)];
    memmem::find_iter(head, MARKER).find(|&pos| opens_report(head, pos))?;

    Some(extract_message(data).unwrap_or_else(|| "service exception report".to_string()))
}

const MARKER: &[u8] = b"ExceptionReport";

/// Vrai si `MARKER` à `pos` est le nom d'une balise ouvrante :
/// `<`, préfixe de namespace optionnel, `Service` optionnel
fn opens_report(head: &[u8], pos: usize) -> bool {
    let mut name = &head[..pos];
    if let Some(rest) = name.strip_suffix(b"Service") {
        name = rest;
    }
    if let Some(rest) = name.strip_suffix(b":") {
        let prefix_len = rest
            .iter()
            .rev()
            .take_while(|&&b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
            .count();
        if prefix_len == 0 {
            return false;
        }
        name = &rest[..rest.len() - prefix_len];
    }
    name.last() == Some(&b'<')
}

/// Extrait `exceptionCode` et le premier `ExceptionText` (ou `ServiceException`)
fn extract_message(data: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(data);
    let mut reader = Reader::from_str(&text);
    reader.trim_text(true);

    let mut code: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"Exception" => {
                        code = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.local_name().as_ref() == b"exceptionCode")
                            .and_then(|a| a.unescape_value().ok())
                            .map(|v| v.into_owned());
                    }
                    b"ExceptionText" | b"ServiceException" => in_text = true,
                    _ => {}
                }
            }
            Ok(Event::Text(t)) if in_text => {
                let message = t.unescape().ok()?.trim().to_string();
                return Some(match code {
                    Some(code) => format!("{}: {}", code, message),
                    None => message,
                });
            }
            Ok(Event::End(_)) => in_text = false,
            Ok(Event::Eof) | Err(_) => return code,
            _ => {}
        }
    }
}
