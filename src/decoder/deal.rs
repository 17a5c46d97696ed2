//! Decoder for closed-transaction (`chengjiao`) listing pages

use crate::dataset::{Column, Record, Schema};
use crate::decoder::{select_all_text, select_attr, select_text, DecodeError, PageDecoder};
use scraper::{ElementRef, Html, Selector};

const ITEM_SELECTOR: &str = "ul.listContent li";

const COLUMNS: &[Column] = &[
    Column::new("title", "房源标题", "暂无数据"),
    Column::new("deal_date", "成交日期", "未知"),
    Column::new("total_price", "总价(万)", "暂无数据"),
    Column::new("unit_price", "单价(元/平)", "暂无数据"),
    Column::new("house_info", "房屋信息", "暂无信息"),
    Column::new("position_info", "楼层信息", "暂无信息"),
    Column::new("listing_price", "挂牌价", "暂无数据"),
    Column::new("deal_cycle", "成交周期", "暂无数据"),
    Column::new("detail_link", "详情页链接", "无链接"),
];

/// Column schema of closed-transaction records
pub const DEAL_SCHEMA: Schema = Schema::new(COLUMNS);

/// Decodes closed-transaction listings
#[derive(Debug, Clone, Copy, Default)]
pub struct DealDecoder;

impl PageDecoder for DealDecoder {
    fn schema(&self) -> Schema {
        DEAL_SCHEMA
    }

    fn decode(&self, html: &str) -> Vec<Record> {
        let document = Html::parse_document(html);
        let Ok(item_selector) = Selector::parse(ITEM_SELECTOR) else {
            return Vec::new();
        };

        let mut records = Vec::new();
        for (index, item) in document.select(&item_selector).enumerate() {
            match decode_item(&item) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping deal listing #{}: {}", index + 1, e),
            }
        }
        records
    }

    fn count_listings(&self, html: &str) -> usize {
        let document = Html::parse_document(html);
        Selector::parse(ITEM_SELECTOR)
            .map(|selector| document.select(&selector).count())
            .unwrap_or(0)
    }
}

fn decode_item(item: &ElementRef<'_>) -> Result<Record, DecodeError> {
    let title = select_text(item, ".title a");
    let detail_link = select_attr(item, "a.img[href]", "href");
    if title.is_none() && detail_link.is_none() {
        return Err(DecodeError::MissingIdentity);
    }

    // Listing price and deal cycle share one container, told apart by their labels
    let mut listing_price = None;
    let mut deal_cycle = None;
    for span in select_all_text(item, ".dealCycleeInfo span") {
        if span.contains("挂牌") {
            listing_price = Some(span);
        } else if span.contains("成交周期") {
            deal_cycle = Some(span);
        }
    }

    Ok(DEAL_SCHEMA
        .record()
        .field("title", title)
        .field("deal_date", select_text(item, ".dealDate"))
        .field("total_price", select_text(item, ".totalPrice .number"))
        .field("unit_price", select_text(item, ".unitPrice .number"))
        .field("house_info", select_text(item, ".houseInfo"))
        .field("position_info", select_text(item, ".positionInfo"))
        .field("listing_price", listing_price)
        .field("deal_cycle", deal_cycle)
        .field("detail_link", detail_link)
        .build())
}
