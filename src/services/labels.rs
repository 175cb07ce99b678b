//! Shipping-label CSV rows for the label printing service.

use crate::{
    config::AppConfig,
    errors::ServiceError,
    models::{Order, SaleDelivery},
    services::{
        csv_export::{encode_shift_jis, render_csv},
        orders::Selection,
    },
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

pub const LABEL_HEADERS: [&str; 8] = [
    "お届け先郵便番号",
    "お届け先氏名",
    "お届け先敬称",
    "お届け先住所1行目",
    "お届け先住所2行目",
    "お届け先住所3行目",
    "お届け先住所4行目",
    "内容品",
];

const HONORIFIC: &str = "様";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LabelSelectionRequest {
    pub selection: Selection,
    #[serde(default)]
    pub describe_contents: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LabelBatch {
    /// 1-based
    pub index: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LabelPlan {
    pub total_rows: usize,
    pub batch_size: usize,
    pub batches: Vec<LabelBatch>,
}

/// A rendered batch ready for download
#[derive(Debug, Clone)]
pub struct LabelFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Drops a leading zero and formats the remaining 7 digits as `NNN-NNNN`
pub fn format_postal(postal: &str) -> String {
    match postal.strip_prefix('0') {
        Some(rest) if rest.len() == 7 && rest.bytes().all(|b| b.is_ascii_digit()) => {
            format!("{}-{}", &rest[..3], &rest[3..])
        }
        _ => postal.to_string(),
    }
}

/// ASCII counts 1, everything else 2
pub fn display_width(text: &str) -> usize {
    text.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

pub fn fits_budget(text: &str, budget: usize) -> bool {
    display_width(text) <= budget
}

/// Consecutive batch ranges over `total` rows
pub fn batch_ranges(total: usize, batch_size: usize) -> Vec<std::ops::Range<usize>> {
    let size = batch_size.max(1);
    (0..total)
        .step_by(size)
        .map(|start| start..(start + size).min(total))
        .collect()
}

#[derive(Debug, Clone)]
pub struct LabelService {
    batch_size: usize,
    content_budget: usize,
    default_contents: String,
}

impl LabelService {
    pub fn new(batch_size: usize, content_budget: usize, default_contents: impl Into<String>) -> Self {
        Self {
            batch_size: batch_size.max(1),
            content_budget,
            default_contents: default_contents.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.label_batch_size,
            config.label_content_budget,
            config.label_default_contents.clone(),
        )
    }

    /// Contents column: product names without whitespace when they fit, else the generic label
    pub fn contents_for(&self, order: &Order, delivery: &SaleDelivery, describe: bool) -> String {
        if !describe {
            return self.default_contents.clone();
        }
        let names: String = order
            .details_for(delivery)
            .iter()
            .flat_map(|d| d.product_name.chars())
            .filter(|c| !c.is_whitespace())
            .collect();
        if !names.is_empty() && fits_budget(&names, self.content_budget) {
            names
        } else {
            self.default_contents.clone()
        }
    }

    /// One row per delivery, in order
    pub fn rows(&self, orders: &[Order], describe: bool) -> Vec<Vec<String>> {
        orders
            .iter()
            .flat_map(|order| {
                order.sale_deliveries.iter().map(move |delivery| {
                    vec![
                        format_postal(&delivery.postal),
                        delivery.name.clone(),
                        HONORIFIC.to_string(),
                        format!("{}{}", delivery.pref_name, delivery.address1),
                        delivery.address2.clone().unwrap_or_default(),
                        String::new(),
                        String::new(),
                        self.contents_for(order, delivery, describe),
                    ]
                })
            })
            .collect()
    }

    pub fn plan(&self, orders: &[Order]) -> LabelPlan {
        let total_rows = orders.iter().map(|o| o.sale_deliveries.len()).sum();
        LabelPlan {
            total_rows,
            batch_size: self.batch_size,
            batches: batch_ranges(total_rows, self.batch_size)
                .into_iter()
                .enumerate()
                .map(|(i, range)| LabelBatch {
                    index: i + 1,
                    rows: range.len(),
                })
                .collect(),
        }
    }

    /// Shift_JIS CSV for the 1-based `batch`
    pub fn render_batch(
        &self,
        orders: &[Order],
        batch: usize,
        describe: bool,
        file_stem: &str,
    ) -> Result<LabelFile, ServiceError> {
        let mut rows = self.rows(orders, describe);
        let ranges = batch_ranges(rows.len(), self.batch_size);
        let range = batch
            .checked_sub(1)
            .and_then(|i| ranges.get(i))
            .cloned()
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Label batch {} does not exist ({} batches)",
                    batch,
                    ranges.len()
                ))
            })?;

        let count = range.len();
        let text = render_csv(&LABEL_HEADERS, rows.drain(range))?;
        counter!("order_desk.labels.rows", count as u64);
        info!(batch, rows = count, "Label batch rendered");

        Ok(LabelFile {
            file_name: format!("{}-{}.csv", file_stem, batch),
            bytes: encode_shift_jis(&text),
        })
    }
}
