//! Place-search slot parsing, query building, and result formatting.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;
use tripflow_clients::Place;

/// Fallback location when the user named none.
pub const DEFAULT_LOCATION: &str = "서울";
/// Fallback category when the user named none.
pub const DEFAULT_CATEGORY: &str = "맛집";
/// Result count when the user asked for no specific number.
pub const DEFAULT_COUNT: usize = 5;

/// Parsed place-search request. `None` = the user did not say.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceQuery {
    pub location: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub mood: Option<String>,
    pub price_range: Option<String>,
    pub count: Option<usize>,
}

impl PlaceQuery {
    /// Context updates; `merge_context` drops the empties.
    pub fn context_updates(&self) -> Vec<(String, Value)> {
        let as_value = |slot: &Option<String>| json!(slot.clone().unwrap_or_default());
        vec![
            ("location".to_string(), as_value(&self.location)),
            ("category".to_string(), as_value(&self.category)),
            ("subcategory".to_string(), as_value(&self.subcategory)),
            ("mood".to_string(), as_value(&self.mood)),
            ("price_range".to_string(), as_value(&self.price_range)),
            (
                "count".to_string(),
                self.count.map(|c| json!(c)).unwrap_or(Value::Null),
            ),
        ]
    }

    /// Slots that must be asked back before searching: location, category,
    /// and for restaurants the cuisine.
    pub fn missing_info(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.location.is_none() {
            missing.push("어느 지역");
        }
        if self.category.is_none() {
            missing.push("어떤 종류의 장소");
        } else if self.category.as_deref() == Some("맛집") && self.subcategory.is_none() {
            missing.push("어떤 종류의 음식");
        }
        missing
    }
}

fn location_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"서울|부산|인천|대구|광주|대전|울산|세종|경기|강원|충북|충남|전북|전남|경북|경남|제주")
                .expect("location pattern must compile"),
            Regex::new(r"[가-힣]{1,6}(?:구|동|읍|면)(?:에서|에|의)?")
                .expect("district pattern must compile"),
        ]
    })
}

const CATEGORY_TABLE: &[(&str, &[&str])] = &[
    ("맛집", &["맛집", "식당", "음식점", "레스토랑"]),
    ("카페", &["카페", "커피숍", "디저트"]),
    ("관광지", &["관광지", "명소", "볼거리", "여행지"]),
    ("쇼핑", &["쇼핑", "마트", "시장", "상가"]),
];

const SUBCATEGORY_TABLE: &[(&str, &[&str])] = &[
    ("한식", &["한식", "한국음식"]),
    ("일식", &["일식", "일본음식", "초밥", "스시"]),
    ("중식", &["중식", "중국음식"]),
    ("양식", &["양식", "서양음식", "이탈리안", "프렌치"]),
    ("카페", &["카페", "디저트", "브런치"]),
];

const MOOD_TABLE: &[(&str, &[&str])] = &[
    ("로맨틱", &["로맨틱", "데이트", "커플"]),
    ("가족", &["가족", "아이", "어린이"]),
    ("친구", &["친구", "단체", "모임"]),
    ("비즈니스", &["비즈니스", "회의", "미팅"]),
];

const PRICE_TABLE: &[(&str, &[&str])] = &[
    ("저가", &["저렴", "싼", "저가", "가성비"]),
    ("중가", &["적당", "중가"]),
    ("고가", &["고급", "비싼", "고가", "럭셔리"]),
];

fn table_lookup(table: &[(&'static str, &[&str])], prompt: &str) -> Option<String> {
    table
        .iter()
        .find(|(_, needles)| needles.iter().any(|needle| prompt.contains(needle)))
        .map(|(label, _)| label.to_string())
}

/// Parse a place-search utterance into slots.
pub fn parse_place_info(prompt: &str) -> PlaceQuery {
    let [regions, districts] = location_patterns();
    let location = regions
        .find(prompt)
        .map(|m| m.as_str().to_string())
        .or_else(|| {
            districts.find(prompt).map(|m| {
                // Trim the attached particle back off the district name.
                let raw = m.as_str();
                raw.trim_end_matches("에서")
                    .trim_end_matches('에')
                    .trim_end_matches('의')
                    .to_string()
            })
        });

    let category = table_lookup(CATEGORY_TABLE, prompt);
    let subcategory = if category.as_deref() == Some("맛집") {
        table_lookup(SUBCATEGORY_TABLE, prompt)
    } else {
        None
    };

    static COUNT: OnceLock<Regex> = OnceLock::new();
    let count = COUNT
        .get_or_init(|| Regex::new(r"(\d{1,2})\s?(?:개|곳|군데)").expect("count pattern"))
        .captures(prompt)
        .and_then(|c| c[1].parse::<usize>().ok())
        .filter(|n| (1..=15).contains(n));

    PlaceQuery {
        location,
        category,
        subcategory,
        mood: table_lookup(MOOD_TABLE, prompt),
        price_range: table_lookup(PRICE_TABLE, prompt),
        count,
    }
}

/// Compose the provider query: category, cuisine, mood, price - in that
/// order, falling back to the default category.
pub fn build_search_query(query: &PlaceQuery) -> String {
    let parts: Vec<&str> = [
        query.category.as_deref(),
        query.subcategory.as_deref(),
        query.mood.as_deref(),
        query.price_range.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        parts.join(" ")
    }
}

/// Human-readable top-N listing.
pub fn format_places(places: &[Place]) -> String {
    if places.is_empty() {
        return "검색 결과가 없습니다.".to_string();
    }

    places
        .iter()
        .take(DEFAULT_COUNT)
        .enumerate()
        .map(|(index, place)| {
            let mut entry = format!(
                "{}. **{}** ({})\n   - 주소: {}\n",
                index + 1,
                place.name,
                place.category,
                place.address
            );
            if let Some(phone) = &place.phone {
                entry.push_str(&format!("   - 전화: {phone}\n"));
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_region_category_and_count() {
        let query = parse_place_info("부산에서 일식 맛집 3곳만 추천해줘");
        assert_eq!(query.location.as_deref(), Some("부산"));
        assert_eq!(query.category.as_deref(), Some("맛집"));
        assert_eq!(query.subcategory.as_deref(), Some("일식"));
        assert_eq!(query.count, Some(3));
        assert!(query.missing_info().is_empty());
    }

    #[test]
    fn district_particles_are_trimmed() {
        let query = parse_place_info("성수동에서 카페 찾아줘");
        assert_eq!(query.location.as_deref(), Some("성수동"));
        assert_eq!(query.category.as_deref(), Some("카페"));
    }

    #[test]
    fn missing_slots_are_reported() {
        let query = parse_place_info("맛집 알려줘");
        assert_eq!(query.missing_info(), vec!["어느 지역", "어떤 종류의 음식"]);

        let query = parse_place_info("서울 어딘가");
        assert_eq!(query.missing_info(), vec!["어떤 종류의 장소"]);
    }

    #[test]
    fn query_composition_and_default() {
        let query = parse_place_info("제주 로맨틱 고급 레스토랑");
        assert_eq!(build_search_query(&query), "맛집 로맨틱 고가");

        assert_eq!(build_search_query(&PlaceQuery::default()), "맛집");
    }

    #[test]
    fn formatting_includes_phone_only_when_present() {
        let places = vec![
            Place {
                name: "성수 카페".into(),
                category: "카페".into(),
                address: "서울 성동구".into(),
                road_address: None,
                phone: Some("02-123-4567".into()),
                url: None,
            },
            Place {
                name: "조용한 서점".into(),
                category: "문화시설".into(),
                address: "서울 마포구".into(),
                road_address: None,
                phone: None,
                url: None,
            },
        ];

        let formatted = format_places(&places);
        assert!(formatted.contains("1. **성수 카페**"));
        assert!(formatted.contains("전화: 02-123-4567"));
        assert!(formatted.contains("2. **조용한 서점**"));
        assert_eq!(formatted.matches("전화:").count(), 1);

        assert_eq!(format_places(&[]), "검색 결과가 없습니다.");
    }
}
