use crate::config::PrecisionModel;
use crate::source::{Coord, Geometry, GeometryFactory};
use crate::types::{BoxKind, PgBox};

/// The box as a closed, shell-only rectangle, stamped with the lower-left corner's SRID.
pub fn box_to_polygon(b: &PgBox, precision: PrecisionModel) -> Geometry {
    let (ll, ur) = (&b.llb, &b.urt);
    let ring = match b.kind {
        BoxKind::Box2d => vec![
            Coord::xy(ll.x, ll.y),
            Coord::xy(ur.x, ll.y),
            Coord::xy(ur.x, ur.y),
            Coord::xy(ll.x, ur.y),
            Coord::xy(ll.x, ll.y),
        ],
        BoxKind::Box3d => {
            let (llz, urz) = (ll.z.unwrap_or(0.0), ur.z.unwrap_or(0.0));
            vec![
                Coord::xyz(ll.x, ll.y, llz),
                Coord::xyz(ur.x, ll.y, llz),
                Coord::xyz(ur.x, ur.y, urz),
                Coord::xyz(ll.x, ur.y, urz),
                Coord::xyz(ll.x, ll.y, llz),
            ]
        }
    };
    let factory = GeometryFactory::new(precision, b.srid());
    let shell = factory.create_linear_ring(ring);
    Geometry::Polygon(factory.create_polygon(shell, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PgPoint;

    #[test]
    fn box2d_rectangle() {
        let b = PgBox::new_2d(PgPoint::new(0.0, 0.0).with_srid(3857), PgPoint::new(10.0, 10.0));
        let geom = box_to_polygon(&b, PrecisionModel::Floating);
        assert_eq!(geom.srid(), 3857);
        match geom {
            Geometry::Polygon(poly) => {
                assert!(poly.interiors().is_empty());
                assert_eq!(
                    poly.exterior().coords(),
                    &[
                        Coord::xy(0.0, 0.0),
                        Coord::xy(10.0, 0.0),
                        Coord::xy(10.0, 10.0),
                        Coord::xy(0.0, 10.0),
                        Coord::xy(0.0, 0.0),
                    ]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn box3d_rectangle() {
        let b = PgBox::new_3d(
            PgPoint::new_3d(1.0, 2.0, 3.0).with_srid(4326),
            PgPoint::new_3d(4.0, 5.0, 6.0),
        );
        let coords = box_to_polygon(&b, PrecisionModel::Floating).coordinates();
        assert_eq!(coords.len(), 5);
        assert_eq!(coords[1], Coord::xyz(4.0, 2.0, 3.0));
        assert_eq!(coords[2], Coord::xyz(4.0, 5.0, 6.0));
        assert_eq!(coords[3], Coord::xyz(1.0, 5.0, 6.0));
        assert_eq!(coords[0], coords[4]);
    }
}
