//! Decoder for homes-for-sale (`ershoufang`) listing pages

use crate::dataset::{Column, Record, Schema};
use crate::decoder::{
    has_match, select_all_text, select_attr, select_text, DecodeError, PageDecoder,
};
use scraper::{ElementRef, Html, Selector};

const ITEM_SELECTOR: &str = "ul.sellListContent li.clear";

const COLUMNS: &[Column] = &[
    Column::new("title", "房源标题", "暂无数据"),
    Column::new("total_price", "总价(万)", "暂无数据"),
    Column::new("unit_price", "单价(元/平)", "暂无数据"),
    Column::new("community", "小区名称", "暂无数据"),
    Column::new("house_info", "房屋信息", "暂无信息"),
    Column::new("position_info", "楼层信息", "暂无信息"),
    Column::new("followers", "关注人数", "0"),
    Column::new("tags", "房源标签", "无标签"),
    Column::new("release_time", "发布时间", "0"),
    Column::new("vr", "VR看房", "无"),
    Column::new("must_see", "必看好房", "否"),
    Column::new("detail_link", "详情页链接", "无链接"),
];

/// Column schema of homes-for-sale records
pub const ON_SALE_SCHEMA: Schema = Schema::new(COLUMNS);

/// Decodes homes-for-sale listings
#[derive(Debug, Clone, Copy, Default)]
pub struct OnSaleDecoder;

impl PageDecoder for OnSaleDecoder {
    fn schema(&self) -> Schema {
        ON_SALE_SCHEMA
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
                Err(e) => tracing::warn!("Skipping on-sale listing #{}: {}", index + 1, e),
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

    let (followers, release_time) = match select_text(item, ".followInfo") {
        Some(text) => {
            let (followers, release) = split_follow_info(&text)?;
            (Some(followers), Some(release))
        }
        None => (None, None),
    };

    let tags = select_all_text(item, ".tag span");
    let tags = (!tags.is_empty()).then(|| tags.join("|"));

    // The community name is the first link of the position block
    let position = select_text(item, ".positionInfo a");

    Ok(ON_SALE_SCHEMA
        .record()
        .field("title", title)
        .field("total_price", select_text(item, ".totalPrice span"))
        .field("unit_price", select_text(item, ".unitPrice span"))
        .field("community", position.clone())
        .field("house_info", select_text(item, ".houseInfo").map(strip_whitespace))
        .field("position_info", position)
        .field("followers", followers)
        .field("tags", tags)
        .field("release_time", release_time)
        .field("vr", Some(yes_no(has_match(item, ".vr_logo"), "有", "无")))
        .field("must_see", Some(yes_no(has_match(item, ".goodhouse_tag"), "是", "否")))
        .field("detail_link", detail_link)
        .build())
}

/// Splits `"12人关注 / 1个月以前发布"` into `("12", "1个月以前发布")`
fn split_follow_info(text: &str) -> Result<(String, String), DecodeError> {
    let (followers, rest) = text
        .split_once('人')
        .ok_or_else(|| DecodeError::MalformedField {
            field: "followInfo",
            value: text.to_string(),
        })?;

    let release = rest
        .trim()
        .trim_start_matches("关注")
        .trim_start()
        .trim_start_matches('/')
        .trim();

    Ok((followers.trim().to_string(), release.to_string()))
}

fn strip_whitespace(text: String) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn yes_no(flag: bool, yes: &str, no: &str) -> String {
    let value = if flag { yes } else { no };
    value.to_string()
}
