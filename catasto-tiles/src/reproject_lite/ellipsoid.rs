//! Définitions des ellipsoïdes

/// Ellipsoïde de référence défini par son demi-grand axe et son aplatissement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Demi-grand axe (rayon équatorial) en mètres
    pub a: f64,
    /// Aplatissement
    pub f: f64,
}

impl Ellipsoid {
    /// WGS84 (UTM 326xx/327xx, Web Mercator)
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6378137.0,
        f: 1.0 / 298.257223563,
    };

    /// GRS80 (ETRS89 258xx, RDN2008 779x)
    /// Note: quasi identique à WGS84, différence < 0.1mm
    pub const GRS80: Ellipsoid = Ellipsoid {
        a: 6378137.0,
        f: 1.0 / 298.257222101,
    };

    /// Première excentricité au carré
    pub fn e2(&self) -> f64 {
        2.0 * self.f - self.f * self.f
    }

    /// Deuxième excentricité au carré
    pub fn ep2(&self) -> f64 {
        self.e2() / (1.0 - self.e2())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eccentricity() {
        // sqrt(e2) WGS84 = 0.0818191908426215
        assert!((Ellipsoid::WGS84.e2().sqrt() - 0.0818191908426215).abs() < 1e-15);
        assert!(Ellipsoid::GRS80.e2() > Ellipsoid::WGS84.e2());
    }
}
