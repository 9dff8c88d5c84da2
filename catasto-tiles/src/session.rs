//! Sessions de saisie interactive
//!
//! Chaque session est une machine à états qui possède sa propre
//! prévisualisation. Une session confirmée produit une [`AreaRequest`].

use geo::{Coord, LineString, MultiLineString, Polygon, Rect};
use thiserror::Error;

use crate::area::AreaRequest;
use crate::types::Crs;

/// Transition refusée
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session not started")]
    NotStarted,

    #[error("session already confirmed")]
    AlreadyConfirmed,

    #[error("a line needs at least 2 vertices, got {0}")]
    NotEnoughVertices(usize),

    #[error("non-finite coordinate")]
    InvalidPoint,
}

fn check(point: Coord) -> Result<Coord, SessionError> {
    if point.x.is_finite() && point.y.is_finite() {
        Ok(point)
    } else {
        Err(SessionError::InvalidPoint)
    }
}

/// États de la saisie d'un rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RectangleState {
    Idle,
    AwaitingFirstPoint,
    AwaitingSecondPoint { first: Coord },
    Confirmed { first: Coord, second: Coord },
}

/// Saisie d'un rectangle par deux clics
#[derive(Debug, Clone)]
pub struct RectangleSession {
    crs: Crs,
    state: RectangleState,
    preview: Option<Polygon>,
}

impl RectangleSession {
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            state: RectangleState::Idle,
            preview: None,
        }
    }

    pub fn state(&self) -> RectangleState {
        self.state
    }

    /// Rectangle en cours (élastique ou confirmé)
    pub fn preview(&self) -> Option<&Polygon> {
        self.preview.as_ref()
    }

    /// Active l'outil ; une session confirmée repart de zéro
    pub fn start(&mut self) {
        self.state = RectangleState::AwaitingFirstPoint;
        self.preview = None;
    }

    pub fn click(&mut self, point: Coord) -> Result<RectangleState, SessionError> {
        let point = check(point)?;
        self.state = match self.state {
            RectangleState::Idle => return Err(SessionError::NotStarted),
            RectangleState::Confirmed { .. } => return Err(SessionError::AlreadyConfirmed),
            RectangleState::AwaitingFirstPoint => RectangleState::AwaitingSecondPoint { first: point },
            RectangleState::AwaitingSecondPoint { first } => {
                self.preview = Some(Rect::new(first, point).to_polygon());
                RectangleState::Confirmed {
                    first,
                    second: point,
                }
            }
        };
        Ok(self.state)
    }

    /// Déplacement du curseur : met à jour l'élastique
    pub fn hover(&mut self, point: Coord) {
        if let (RectangleState::AwaitingSecondPoint { first }, Ok(point)) = (self.state, check(point)) {
            self.preview = Some(Rect::new(first, point).to_polygon());
        }
    }

    /// Abandon : retour à `Idle`, prévisualisation effacée
    pub fn cancel(&mut self) {
        self.state = RectangleState::Idle;
        self.preview = None;
    }

    /// Requête issue d'une session confirmée
    pub fn request(&self) -> Option<AreaRequest> {
        match self.state {
            RectangleState::Confirmed { first, second } => Some(AreaRequest::Rectangle {
                a: first,
                b: second,
                crs: self.crs,
            }),
            _ => None,
        }
    }
}

/// États de la saisie d'une polyligne
#[derive(Debug, Clone, PartialEq)]
pub enum PolylineState {
    Idle,
    Accumulating { vertices: Vec<Coord> },
    Confirmed { line: LineString },
}

/// Saisie d'une polyligne vertex par vertex
#[derive(Debug, Clone)]
pub struct PolylineSession {
    crs: Crs,
    state: PolylineState,
    preview: Option<LineString>,
}

impl PolylineSession {
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            state: PolylineState::Idle,
            preview: None,
        }
    }

    pub fn state(&self) -> &PolylineState {
        &self.state
    }

    pub fn preview(&self) -> Option<&LineString> {
        self.preview.as_ref()
    }

    pub fn start(&mut self) {
        self.state = PolylineState::Accumulating {
            vertices: Vec::new(),
        };
        self.preview = None;
    }

    pub fn add_vertex(&mut self, point: Coord) -> Result<usize, SessionError> {
        let point = check(point)?;
        match &mut self.state {
            PolylineState::Idle => Err(SessionError::NotStarted),
            PolylineState::Confirmed { .. } => Err(SessionError::AlreadyConfirmed),
            PolylineState::Accumulating { vertices } => {
                vertices.push(point);
                let count = vertices.len();
                self.preview = Some(LineString::new(vertices.clone()));
                Ok(count)
            }
        }
    }

    /// Segment provisoire jusqu'au curseur
    pub fn hover(&mut self, point: Coord) {
        if let (PolylineState::Accumulating { vertices }, Ok(point)) = (&self.state, check(point)) {
            if !vertices.is_empty() {
                let mut coords = vertices.clone();
                coords.push(point);
                self.preview = Some(LineString::new(coords));
            }
        }
    }

    /// Termine la saisie (double-clic)
    pub fn finish(&mut self) -> Result<(), SessionError> {
        let vertices = match &self.state {
            PolylineState::Idle => return Err(SessionError::NotStarted),
            PolylineState::Confirmed { .. } => return Err(SessionError::AlreadyConfirmed),
            PolylineState::Accumulating { vertices } => vertices,
        };
        if vertices.len() < 2 {
            return Err(SessionError::NotEnoughVertices(vertices.len()));
        }
        let line = LineString::new(vertices.clone());
        self.preview = Some(line.clone());
        self.state = PolylineState::Confirmed { line };
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.state = PolylineState::Idle;
        self.preview = None;
    }

    /// Requête de buffer issue d'une session confirmée
    pub fn request(&self, distance_m: f64) -> Option<AreaRequest> {
        match &self.state {
            PolylineState::Confirmed { line } => Some(AreaRequest::LineBuffer {
                lines: MultiLineString::new(vec![line.clone()]),
                crs: self.crs,
                distance_m,
            }),
            _ => None,
        }
    }
}
