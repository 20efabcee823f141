//! Category → subcategory → field operations.
//!
//! Children are owned by their parents: deleting a category drops its
//! subcategories and their fields with it. Lookups are by id within the
//! parent, first match wins. Reads hand out copies; the only way to change a
//! field descriptor is through an update operation here.

use crate::ids::{self, CATEGORY_PREFIX, FIELD_PREFIX, SUBCATEGORY_PREFIX};
use crate::local_store::KeyValueStore;
use crate::manager::DataManager;
use crate::model::{
    slugify, Category, CategoryPatch, Field, FieldPatch, NewCategory, NewField, NewSubcategory,
    Subcategory, SubcategoryPatch,
};

const DEFAULT_ICON: &str = "category";

impl<S: KeyValueStore> DataManager<S> {
    // ===== CATEGORIES =====

    pub fn list_categories(&self) -> Vec<Category> {
        self.data.categories.clone()
    }

    pub fn get_category(&self, category_id: &str) -> Option<Category> {
        self.data
            .categories
            .iter()
            .find(|c| c.id == category_id)
            .cloned()
    }

    pub fn get_category_by_slug(&self, slug: &str) -> Option<Category> {
        self.data.categories.iter().find(|c| c.slug == slug).cloned()
    }

    pub fn create_category(&mut self, new: NewCategory) -> Category {
        let category = Category {
            id: ids::new_id(CATEGORY_PREFIX),
            slug: slugify(&new.name),
            name: new.name,
            icon: new.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
            subcategories: Vec::new(),
        };
        self.data.categories.push(category.clone());
        self.commit();
        category
    }

    pub fn update_category(&mut self, category_id: &str, patch: CategoryPatch) -> Option<Category> {
        let category = self.category_mut(category_id)?;
        patch.apply_to(category);
        let updated = category.clone();
        self.commit();
        Some(updated)
    }

    /// Returns whether a category was removed. Absent ids are not an error.
    pub fn delete_category(&mut self, category_id: &str) -> bool {
        let before = self.data.categories.len();
        self.data.categories.retain(|c| c.id != category_id);
        let removed = self.data.categories.len() != before;
        self.commit();
        removed
    }

    // ===== SUBCATEGORIES =====

    /// Empty when the category does not exist.
    pub fn list_subcategories(&self, category_id: &str) -> Vec<Subcategory> {
        self.data
            .categories
            .iter()
            .find(|c| c.id == category_id)
            .map(|c| c.subcategories.clone())
            .unwrap_or_default()
    }

    pub fn get_subcategory(&self, category_id: &str, subcategory_id: &str) -> Option<Subcategory> {
        self.find_subcategory(category_id, subcategory_id).cloned()
    }

    /// `None` when the parent category does not exist.
    pub fn create_subcategory(
        &mut self,
        category_id: &str,
        new: NewSubcategory,
    ) -> Option<Subcategory> {
        let category = self.category_mut(category_id)?;
        let subcategory = Subcategory {
            id: ids::new_id(SUBCATEGORY_PREFIX),
            slug: slugify(&new.name),
            name: new.name,
            fields: Vec::new(),
        };
        category.subcategories.push(subcategory.clone());
        self.commit();
        Some(subcategory)
    }

    pub fn update_subcategory(
        &mut self,
        category_id: &str,
        subcategory_id: &str,
        patch: SubcategoryPatch,
    ) -> Option<Subcategory> {
        let subcategory = self.subcategory_mut(category_id, subcategory_id)?;
        patch.apply_to(subcategory);
        let updated = subcategory.clone();
        self.commit();
        Some(updated)
    }

    pub fn delete_subcategory(&mut self, category_id: &str, subcategory_id: &str) -> bool {
        let Some(category) = self.category_mut(category_id) else {
            return false;
        };
        let before = category.subcategories.len();
        category.subcategories.retain(|s| s.id != subcategory_id);
        let removed = category.subcategories.len() != before;
        self.commit();
        removed
    }

    // ===== FIELDS =====

    /// Empty when the subcategory does not resolve through the category.
    pub fn get_fields_by_subcategory(&self, category_id: &str, subcategory_id: &str) -> Vec<Field> {
        self.find_subcategory(category_id, subcategory_id)
            .map(|s| s.fields.clone())
            .unwrap_or_default()
    }

    pub fn get_field(&self, category_id: &str, subcategory_id: &str, field_id: &str) -> Option<Field> {
        self.find_subcategory(category_id, subcategory_id)?
            .fields
            .iter()
            .find(|f| f.id == field_id)
            .cloned()
    }

    /// `None` when the subcategory does not resolve through the category.
    /// Select options are stored as given; validating them is the editor's job.
    pub fn create_field(
        &mut self,
        category_id: &str,
        subcategory_id: &str,
        new: NewField,
    ) -> Option<Field> {
        let subcategory = self.subcategory_mut(category_id, subcategory_id)?;
        let field = Field {
            id: ids::new_id(FIELD_PREFIX),
            label: new.label,
            field_type: new.field_type,
            required: new.required,
            placeholder: new.placeholder.unwrap_or_default(),
            options: new.options,
        };
        subcategory.fields.push(field.clone());
        self.commit();
        Some(field)
    }

    pub fn update_field(
        &mut self,
        category_id: &str,
        subcategory_id: &str,
        field_id: &str,
        patch: FieldPatch,
    ) -> Option<Field> {
        let field = self
            .subcategory_mut(category_id, subcategory_id)?
            .fields
            .iter_mut()
            .find(|f| f.id == field_id)?;
        patch.apply_to(field);
        let updated = field.clone();
        self.commit();
        Some(updated)
    }

    pub fn delete_field(&mut self, category_id: &str, subcategory_id: &str, field_id: &str) -> bool {
        let Some(subcategory) = self.subcategory_mut(category_id, subcategory_id) else {
            return false;
        };
        let before = subcategory.fields.len();
        subcategory.fields.retain(|f| f.id != field_id);
        let removed = subcategory.fields.len() != before;
        self.commit();
        removed
    }

    fn find_subcategory(&self, category_id: &str, subcategory_id: &str) -> Option<&Subcategory> {
        self.data
            .categories
            .iter()
            .find(|c| c.id == category_id)?
            .subcategories
            .iter()
            .find(|s| s.id == subcategory_id)
    }

    fn category_mut(&mut self, category_id: &str) -> Option<&mut Category> {
        self.data.categories.iter_mut().find(|c| c.id == category_id)
    }

    fn subcategory_mut(&mut self, category_id: &str, subcategory_id: &str) -> Option<&mut Subcategory> {
        self.category_mut(category_id)?
            .subcategories
            .iter_mut()
            .find(|s| s.id == subcategory_id)
    }
}
