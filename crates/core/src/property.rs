//! Static catalog of rental properties and their golf carts.
//!
//! Each property owns exactly one cart and one diagram image. Inspections
//! store the property's display name, so lookups by name are as common as
//! lookups by id.

use serde::Serialize;

use crate::diagram::normalize_diagram_name;

/// Seat type used when the catalog does not record one.
pub const DEFAULT_CART_TYPE: &str = "4-Seater";

/// A catalog entry pairing a property with its cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Property {
    pub id: &'static str,
    pub name: &'static str,
    pub cart_number: &'static str,
    /// Diagram image filename inside the `diagrams` bucket.
    pub diagram_file: &'static str,
    pub cart_type: Option<&'static str>,
}

impl Property {
    /// Seat type of the cart, falling back to [`DEFAULT_CART_TYPE`].
    pub fn resolved_cart_type(&self) -> &'static str {
        self.cart_type.unwrap_or(DEFAULT_CART_TYPE)
    }

    /// Diagram name without the image extension; the key for default marks.
    pub fn diagram_name(&self) -> &'static str {
        normalize_diagram_name(self.diagram_file)
    }
}

pub const PROPERTIES: &[Property] = &[
    Property {
        id: "rental_6_passenger_150",
        name: "Rental #150",
        cart_number: "150",
        diagram_file: "rental_150.jpg",
        cart_type: Some("6-Seater"),
    },
    Property {
        id: "rental_6_passenger_144",
        name: "Rental #144",
        cart_number: "144",
        diagram_file: "rental_144.jpg",
        cart_type: Some("6-Seater"),
    },
    Property {
        id: "villa_flora_10180",
        name: "Villa Flora 10180",
        cart_number: "18",
        diagram_file: "villaflora_10180.jpg",
        cart_type: Some("4-Seater"),
    },
    Property {
        id: "ocean_haven_208",
        name: "Ocean Haven 208",
        cart_number: "71",
        diagram_file: "oceanhaven_208.jpg",
        cart_type: Some("4-Seater"),
    },
    Property {
        id: "casa_prestige_g7_4_passenger",
        name: "Casa Prestige G7 (4 passenger)",
        cart_number: "22",
        diagram_file: "casaprestige_4.jpg",
        cart_type: Some("4-Seater"),
    },
    Property {
        id: "casa_prestige_g7_6_passenger",
        name: "Casa Prestige G7 (6 passenger)",
        cart_number: "193",
        diagram_file: "casaprestige_6.jpg",
        cart_type: Some("6-Seater"),
    },
    Property {
        id: "villa_tiffany_10389",
        name: "Villa Tiffany 10389",
        cart_number: "136",
        diagram_file: "villatiffany_10389.jpg",
        cart_type: Some("6-Seater"),
    },
    Property {
        id: "villa_palacio_7256",
        name: "Villa Palacio 7256",
        cart_number: "130",
        diagram_file: "villapalacio_7256.jpg",
        cart_type: None,
    },
    Property {
        id: "villa_clara_3325",
        name: "Villa Clara 3325",
        cart_number: "119",
        diagram_file: "villaclara_3325.jpg",
        cart_type: Some("6-Seater"),
    },
    Property {
        id: "apt_2_102_72",
        name: "Apt 2-102 #72",
        cart_number: "72",
        diagram_file: "apt2102_72.jpg",
        cart_type: Some("4-Seater"),
    },
    Property {
        id: "villa_paloma_5138",
        name: "Villa Paloma 5138",
        cart_number: "101",
        diagram_file: "villapaloma_5138.jpg",
        cart_type: Some("6-Seater"),
    },
];

/// Look up a property by its catalog id.
pub fn find_by_id(id: &str) -> Option<&'static Property> {
    PROPERTIES.iter().find(|p| p.id == id)
}

/// Look up a property by its display name (exact match).
pub fn find_by_name(name: &str) -> Option<&'static Property> {
    PROPERTIES.iter().find(|p| p.name == name)
}

/// Whether `diagram_name` (with or without extension) is the diagram of a
/// catalog property.
pub fn is_catalog_diagram(diagram_name: &str) -> bool {
    let name = normalize_diagram_name(diagram_name);
    PROPERTIES.iter().any(|p| p.diagram_name() == name)
}
