//! Default taxonomy written when storage is empty or unreadable.
//!
//! Ids here are fixed so that listings created against a seeded store keep
//! resolving after a reseed on another device.

use crate::model::{AppData, Category, Field, FieldType, Subcategory};

fn text(id: &str, label: &str, required: bool, placeholder: &str) -> Field {
    Field {
        id: id.to_string(),
        label: label.to_string(),
        field_type: FieldType::Text,
        required,
        placeholder: placeholder.to_string(),
        options: Vec::new(),
    }
}

fn number(id: &str, label: &str, required: bool, placeholder: &str) -> Field {
    Field {
        field_type: FieldType::Number,
        ..text(id, label, required, placeholder)
    }
}

fn select(id: &str, label: &str, required: bool, options: &[&str]) -> Field {
    Field {
        id: id.to_string(),
        label: label.to_string(),
        field_type: FieldType::Select,
        required,
        placeholder: String::new(),
        options: options.iter().map(|o| o.to_string()).collect(),
    }
}

fn subcategory(id: &str, name: &str, slug: &str, fields: Vec<Field>) -> Subcategory {
    Subcategory {
        id: id.to_string(),
        name: name.to_string(),
        slug: slug.to_string(),
        fields,
    }
}

fn category(id: &str, name: &str, icon: &str, slug: &str, subcategories: Vec<Subcategory>) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        slug: slug.to_string(),
        subcategories,
    }
}

pub fn default_categories() -> Vec<Category> {
    vec![
        category(
            "cat_electronics",
            "Electronics",
            "devices",
            "electronics",
            vec![
                subcategory(
                    "sub_mobiles",
                    "Mobile Phones",
                    "mobile-phones",
                    vec![
                        text("f1", "Brand", true, "e.g., Samsung, Apple"),
                        text("f2", "Model", true, "e.g., Galaxy S23"),
                        number("f3", "Price", true, "Enter price"),
                        select("f4", "Condition", true, &["New", "Like New", "Used", "Refurbished"]),
                        select("f5", "RAM", false, &["4GB", "6GB", "8GB", "12GB", "16GB"]),
                        select("f6", "Storage", false, &["64GB", "128GB", "256GB", "512GB", "1TB"]),
                    ],
                ),
                subcategory(
                    "sub_laptops",
                    "Laptops",
                    "laptops",
                    vec![
                        text("f7", "Brand", true, "e.g., Dell, HP, Lenovo"),
                        text("f8", "Model", true, "e.g., XPS 13"),
                        number("f9", "Price", true, "Enter price"),
                        text("f10", "Processor", false, "e.g., Intel i7"),
                        select("f11", "RAM", false, &["4GB", "8GB", "16GB", "32GB", "64GB"]),
                        select("f12", "Storage Type", false, &["SSD", "HDD", "Hybrid"]),
                    ],
                ),
            ],
        ),
        category(
            "cat_vehicles",
            "Vehicles",
            "directions_car",
            "vehicles",
            vec![subcategory(
                "sub_cars",
                "Cars",
                "cars",
                vec![
                    text("f13", "Make", true, "e.g., Toyota, Honda"),
                    text("f14", "Model", true, "e.g., Camry"),
                    number("f15", "Year", true, "e.g., 2020"),
                    number("f16", "Price", true, "Enter price"),
                    select("f17", "Fuel Type", true, &["Petrol", "Diesel", "Electric", "Hybrid"]),
                    number("f18", "Kilometers", false, "Odometer reading"),
                ],
            )],
        ),
        category(
            "cat_realestate",
            "Real Estate",
            "home",
            "real-estate",
            vec![subcategory(
                "sub_apartments",
                "Apartments",
                "apartments",
                vec![
                    select("f19", "Property Type", true, &["Rent", "Sale"]),
                    select("f20", "BHK", true, &["1 BHK", "2 BHK", "3 BHK", "4 BHK", "5+ BHK"]),
                    number("f21", "Price", true, "Enter price"),
                    number("f22", "Area (sq ft)", false, "Built-up area"),
                    select("f23", "Furnishing", false, &["Fully Furnished", "Semi Furnished", "Unfurnished"]),
                ],
            )],
        ),
    ]
}

/// Fresh aggregate: seeded taxonomy, no listings, users or messages.
pub fn default_app_data() -> AppData {
    AppData {
        categories: default_categories(),
        ..AppData::default()
    }
}
