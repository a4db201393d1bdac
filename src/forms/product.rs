use super::{FormDraft, FormWizard};
use crate::models::validation::is_sku;
use crate::models::{Product, SaleMode, ValidationErrors, MAX_PRODUCT_IMAGES};
use crate::pricing::{BulkPricingState, PricingError, Unit};
use crate::wizard::WizardStep;

pub const DETAILS: usize = 0;
pub const PRICING: usize = 1;
pub const MEDIA: usize = 2;

/// 商品创建向导
pub type ProductWizard = FormWizard<ProductDraft>;

#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub provider_id: Option<i64>,
    pub unit_price: Option<f64>,
    pub stock: i64,
    pub members_only: bool,
    images: Vec<String>,
    bulk: Option<BulkPricingState>,
}

impl Default for ProductDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            sku: String::new(),
            description: None,
            category_id: None,
            provider_id: None,
            unit_price: None,
            stock: 0,
            members_only: false,
            images: Vec::new(),
            bulk: None,
        }
    }
}

impl ProductDraft {
    /// 切换为批量销售, 已开启的会话保持不变
    pub fn enable_bulk(&mut self, base_unit: Unit, base_price: f64) -> Result<(), PricingError> {
        if self.bulk.is_none() {
            self.bulk = Some(BulkPricingState::new(base_unit, base_price)?);
        }
        Ok(())
    }

    /// 关闭散装模式, 丢弃全部单位价格
    pub fn disable_bulk(&mut self) {
        self.bulk = None;
    }

    pub fn bulk(&self) -> Option<&BulkPricingState> {
        self.bulk.as_ref()
    }

    pub fn bulk_mut(&mut self) -> Option<&mut BulkPricingState> {
        self.bulk.as_mut()
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    /// 达到图片上限时返回 false
    pub fn add_image(&mut self, key: impl Into<String>) -> bool {
        if self.images.len() >= MAX_PRODUCT_IMAGES {
            return false;
        }
        self.images.push(key.into());
        true
    }

    pub fn remove_image(&mut self, key: &str) -> bool {
        let before = self.images.len();
        self.images.retain(|k| k != key);
        self.images.len() != before
    }

    fn sale(&self) -> SaleMode {
        match &self.bulk {
            Some(bulk) => SaleMode::Bulk {
                base_unit: bulk.base_unit(),
                base_price: bulk.base_price(),
                units: bulk.to_entries(),
            },
            None => SaleMode::Unit {
                price: self.unit_price.unwrap_or_default(),
            },
        }
    }
}

impl FormDraft for ProductDraft {
    type Output = Product;

    const WIZARD_ID: &'static str = "product-create";

    fn steps() -> Vec<WizardStep> {
        vec![
            WizardStep { key: "details", title: "Details" },
            WizardStep { key: "pricing", title: "Pricing" },
            WizardStep { key: "media", title: "Media" },
            WizardStep { key: "review", title: "Review" },
        ]
    }

    fn validate_step(&self, index: usize) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match index {
            DETAILS => {
                errors.required("name", &self.name);
                if !is_sku(&self.sku) {
                    errors.add("sku", "SKU must be 2-40 letters, digits, '-' or '_'");
                }
                if self.category_id.is_none() {
                    errors.add("category_id", "Required");
                }
                if self.provider_id.is_none() {
                    errors.add("provider_id", "Required");
                }
            }
            PRICING => {
                if self.stock < 0 {
                    errors.add("stock", "Must be zero or greater");
                }
                match &self.bulk {
                    None => errors.non_negative("unit_price", self.unit_price),
                    Some(bulk) => {
                        for entry in bulk.entries() {
                            if entry.price.is_none() {
                                errors.add(
                                    &format!("units.{}", entry.unit.key()),
                                    "Set a margin or a price",
                                );
                            }
                        }
                    }
                }
            }
            MEDIA => {
                if self.images.len() > MAX_PRODUCT_IMAGES {
                    errors.add("images", format!("At most {} images", MAX_PRODUCT_IMAGES));
                }
            }
            _ => {}
        }
        errors
    }

    fn build(&self) -> Product {
        Product {
            name: self.name.trim().to_string(),
            sku: self.sku.trim().to_string(),
            description: self
                .description
                .as_ref()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            category_id: self.category_id,
            provider_id: self.provider_id,
            sale: self.sale(),
            stock: self.stock,
            images: self.images.clone(),
            members_only: self.members_only,
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entity;
    use crate::pricing::display_margin;
    use crate::wizard::Direction;

    fn details() -> ProductDraft {
        ProductDraft {
            name: "Dried mango".to_string(),
            sku: "MANGO-1".to_string(),
            category_id: Some(3),
            provider_id: Some(7),
            ..ProductDraft::default()
        }
    }

    #[test]
    fn details_block_next_and_keep_errors() {
        let mut wizard = ProductWizard::new(ProductDraft::default());
        assert!(!wizard.next());
        assert_eq!(wizard.controller().active_index(), DETAILS);
        assert!(wizard.errors().has("name"));
        assert!(wizard.errors().has("sku"));

        wizard.draft_mut().name = "Dried mango".to_string();
        wizard.draft_mut().sku = "MANGO-1".to_string();
        wizard.draft_mut().category_id = Some(3);
        wizard.draft_mut().provider_id = Some(7);
        assert!(wizard.next());
        assert!(wizard.errors().is_empty());
        assert_eq!(wizard.controller().direction(), Direction::Forward);
    }

    #[test]
    fn bulk_pricing_flow_produces_bulk_product() {
        let mut wizard = ProductWizard::new(details());
        assert!(wizard.next());

        // 基础单位: 盎司 $10.00
        wizard.draft_mut().enable_bulk(Unit::Ounce, 10.0).unwrap();
        let bulk = wizard.draft_mut().bulk_mut().unwrap();
        bulk.add_unit(Unit::Gram).unwrap();
        bulk.focus_margin(Unit::Gram).unwrap();
        bulk.set_margin(Unit::Gram, Some(0.0)).unwrap();
        bulk.blur_margin(Unit::Gram).unwrap();
        assert_eq!(bulk.entry(Unit::Gram).unwrap().price, Some(0.35));

        bulk.focus_price(Unit::Gram).unwrap();
        bulk.set_price(Unit::Gram, Some(0.50)).unwrap();
        bulk.blur_price(Unit::Gram).unwrap();
        let margin = bulk.entry(Unit::Gram).unwrap().margin_percent;
        assert_eq!(display_margin(margin), "41.75");

        assert!(wizard.next());
        assert!(wizard.draft_mut().add_image("products/a-front.png"));
        assert!(wizard.next());
        assert!(wizard.controller().is_last());

        let product = wizard.finish().unwrap();
        assert!(product.validate().is_ok());
        match product.sale {
            SaleMode::Bulk {
                base_unit,
                base_price,
                units,
            } => {
                assert_eq!(base_unit, Unit::Ounce);
                assert_eq!(base_price, 10.0);
                assert_eq!(units.len(), 1);
                assert_eq!(units[0].price, Some(0.5));
            }
            other => panic!("expected bulk sale, got {:?}", other),
        }
    }

    #[test]
    fn unpriced_bulk_unit_blocks_pricing_step() {
        let mut wizard = ProductWizard::new(details());
        assert!(wizard.next());
        wizard.draft_mut().enable_bulk(Unit::Pound, 4.0).unwrap();
        wizard.draft_mut().bulk_mut().unwrap().add_unit(Unit::Ounce).unwrap();
        assert!(!wizard.next());
        assert!(wizard.errors().has("units.oz"));

        wizard.draft_mut().disable_bulk();
        assert!(!wizard.next());
        assert!(wizard.errors().has("unit_price"));
        wizard.draft_mut().unit_price = Some(12.5);
        assert!(wizard.next());
    }

    #[test]
    fn image_limit_is_enforced() {
        let mut draft = details();
        for i in 0..MAX_PRODUCT_IMAGES {
            assert!(draft.add_image(format!("products/{}.png", i)));
        }
        assert!(!draft.add_image("products/extra.png"));
        assert!(draft.remove_image("products/0.png"));
        assert_eq!(draft.images().len(), MAX_PRODUCT_IMAGES - 1);
    }

    #[test]
    fn jump_back_to_completed_step() {
        let mut wizard = ProductWizard::new(ProductDraft {
            unit_price: Some(3.0),
            ..details()
        });
        assert!(wizard.next());
        assert!(wizard.next());
        assert!(!wizard.request_jump(3));
        assert!(wizard.request_jump(DETAILS));
        assert_eq!(wizard.apply_pending_jump(), Some(DETAILS));
        assert_eq!(wizard.apply_pending_jump(), None);
        assert_eq!(wizard.controller().direction(), Direction::Backward);
    }

    #[test]
    fn finish_reports_every_step() {
        let mut wizard = ProductWizard::new(ProductDraft::default());
        let errors = wizard.finish().unwrap_err();
        assert!(errors.has("name") && errors.has("unit_price"));
        assert_eq!(wizard.errors(), &errors);
    }
}
