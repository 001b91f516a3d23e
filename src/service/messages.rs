//! User-facing operation messages: catalog entry when present, English text otherwise.

use crate::lang::Translator;

pub struct Messages<'a> {
    lang: &'a Translator,
}

impl<'a> Messages<'a> {
    pub fn new(lang: &'a Translator) -> Self {
        Messages { lang }
    }

    fn format(&self, key: &str, replace: &[(&str, &str)], fallback: impl FnOnce() -> String) -> String {
        let key = format!("{}.{}", crate::lang::NAMESPACE, key);
        if self.lang.has(&key) {
            self.lang.trans(&key, replace)
        } else {
            fallback()
        }
    }

    pub fn store_failed(&self) -> String {
        self.format("storefailed", &[], || {
            "Operation failed while creating a new record.".into()
        })
    }

    pub fn update_failed(&self, number: &str) -> String {
        self.format("updatefailed", &[("number", number)], || {
            format!("Operation failed while updating the record: {}", number)
        })
    }

    pub fn destroy_failed(&self, number: &str) -> String {
        self.format("destroyfailed", &[("number", number)], || {
            format!("Operation failed while destroying the record: {}", number)
        })
    }

    pub fn store_successful(&self, number: &str) -> String {
        self.format("storesuccessful", &[("number", number)], || {
            format!("Newly created record number: {}", number)
        })
    }

    pub fn update_successful(&self, number: &str) -> String {
        self.format("updatesuccessful", &[("number", number)], || {
            format!("Register successfully updated: {}", number)
        })
    }

    pub fn destroy_successful(&self, number: &str) -> String {
        self.format("destroysuccessful", &[("number", number)], || {
            format!("Register successfully deleted: {}", number)
        })
    }

    pub fn view_not_found(&self, view: &str) -> String {
        self.format("viewnotfound", &[("view", view)], || {
            format!(
                "Requested page couldn't be loaded because the view file is missing: {}",
                view
            )
        })
    }

    pub fn property_not_set(&self, property: &str) -> String {
        self.format("propertynotset", &[("property", property)], || {
            format!("{} property must be set.", property)
        })
    }

    pub fn data_to_missing_relation(&self, name: &str) -> String {
        self.format("data2relationinexistent", &[("relationName", name)], || {
            format!(
                "Array type request data '{}' is not named after an existent relation.",
                name
            )
        })
    }

    pub fn file_to_missing_relation(&self, name: &str) -> String {
        self.format("file2relationinexistent", &[("relationName", name)], || {
            format!("Request file '{}' is not named after an existent relation.", name)
        })
    }

    pub fn upload_failed(&self, field: &str) -> String {
        self.format("uploadfailed", &[("field", field)], || {
            format!("The file '{}' could not be uploaded.", field)
        })
    }
}
