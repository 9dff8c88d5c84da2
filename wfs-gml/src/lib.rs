//! # wfs-gml
//!
//! Parser pour les réponses WFS 2.0 `GetFeature` encodées en GML 3.2,
//! tel que servies par le WFS INSPIRE des parcelles cadastrales.
//!
//! ## Features
//!
//! - Détection des rapports d'exception OWS avec `memchr`
//! - Validation UTF-8 SIMD avec `simdutf8`, repli `encoding_rs` selon la déclaration XML
//! - Aplatissement des attributs INSPIRE (`inspireId_localId`, ...)
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wfs_gml::{parse, ParseOptions};
//!
//! let result = parse(&body, &ParseOptions::default())?;
//! println!("{} features", result.features.len());
//!
//! if result.is_truncated() {
//!     println!("Réponse tronquée par le serveur");
//! }
//! ```

pub mod error;
pub mod parser;
pub mod types;

pub use error::GmlError;
pub use types::{AxisOrder, Feature, ParseOptions, ParseResult};

use std::borrow::Cow;

/// Parse le corps d'une réponse GetFeature.
///
/// # Errors
///
/// Retourne `GmlError::ServiceException` si le corps est un rapport d'exception,
/// `GmlError::Xml` / `GmlError::UnexpectedRoot` si le document est inexploitable.
/// Les géométries invalides ne sont pas fatales : elles sont listées dans
/// `ParseResult::errors`.
pub fn parse(data: &[u8], options: &ParseOptions) -> Result<ParseResult, GmlError> {
    // 1. Rapport d'exception (peut arriver avec un statut HTTP 200)
    if let Some(message) = parser::exception::detect_exception(data) {
        return Err(GmlError::ServiceException(message));
    }

    // 2. Décoder
    let text = decode(data)?;

    // 3. Parcourir la collection
    parser::parse_document(&text, options)
}

/// Décode le document : UTF-8 direct, sinon l'encodage de la déclaration XML
fn decode(data: &[u8]) -> Result<Cow<'_, str>, GmlError> {
    if let Ok(text) = simdutf8::basic::from_utf8(data) {
        return Ok(Cow::Borrowed(text));
    }

    let label = declared_encoding(data)
        .ok_or_else(|| GmlError::Encoding("invalid UTF-8 and no declared encoding".into()))?;
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| GmlError::Encoding(label.clone()))?;

    let (decoded, _, had_errors) = encoding.decode(data);
    if had_errors {
        return Err(GmlError::Encoding(format!(
            "content is not valid {}",
            encoding.name()
        )));
    }
    Ok(decoded)
}

/// Lit `encoding="..."` dans la déclaration `<?xml ...?>`
fn declared_encoding(data: &[u8]) -> Option<String> {
    let end = memchr::memmem::find(data, b"?>")?;
    let decl = &data[..end];
    let pos = memchr::memmem::find(decl, b"encoding=")?;
    let rest = &decl[pos + 9..];
    let quote = *rest.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let close = memchr::memchr(quote, &rest[1..])?;
    Some(String::from_utf8_lossy(&rest[1..1 + close]).into_owned())
}
