//! The nine-entry element table and the cumulative index mapping.

use std::fmt;

/// One entry of the element table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element {
    /// Original label, e.g. `大安=1东方木青龙`.
    pub label: &'static str,
    pub name: &'static str,
    pub numeral: u8,
    /// Compass direction (`中` for the centre).
    pub direction: &'static str,
    /// Five-phase element.
    pub phase: &'static str,
    pub guardian: &'static str,
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

const fn entry(
    label: &'static str,
    name: &'static str,
    numeral: u8,
    direction: &'static str,
    phase: &'static str,
    guardian: &'static str,
) -> Element {
    Element {
        label,
        name,
        numeral,
        direction,
        phase,
        guardian,
    }
}

/// 六神六煞與五行方位對應表
pub const ELEMENTS: [Element; 9] = [
    entry("大安=1东方木青龙", "大安", 1, "东方", "木", "青龙"),
    entry("留连=2西南木青龙", "留连", 2, "西南", "木", "青龙"),
    entry("速喜=3正南火朱雀", "速喜", 3, "正南", "火", "朱雀"),
    entry("赤口=4西方金白虎", "赤口", 4, "西方", "金", "白虎"),
    entry("小吉=5北方水玄武", "小吉", 5, "北方", "水", "玄武"),
    entry("空亡=6中土藤蛇", "空亡", 6, "中", "土", "藤蛇"),
    entry("病符=7西南金白虎", "病符", 7, "西南", "金", "白虎"),
    entry("桃花=8东北土勾陈", "桃花", 8, "东北", "土", "勾陈"),
    entry("天德=9西北金白虎", "天德", 9, "西北", "金", "白虎"),
];

const TABLE_LEN: i64 = ELEMENTS.len() as i64;

/// Ordered triple of elements produced by one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementResult {
    pub first: Element,
    pub second: Element,
    pub third: Element,
}

impl ElementResult {
    pub fn as_array(&self) -> [Element; 3] {
        [self.first, self.second, self.third]
    }

    pub fn labels(&self) -> [&'static str; 3] {
        [self.first.label, self.second.label, self.third.label]
    }
}

impl fmt::Display for ElementResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.first, self.second, self.third)
    }
}

/// Table index for a cumulative sum of `count` inputs.
///
/// Uses Euclidean remainder so zero inputs wrap to the last entry.
#[inline]
fn table_index(sum: i64, count: i64) -> usize {
    (sum - count).rem_euclid(TABLE_LEN) as usize
}

/// The three table indices for `n1`, `n2`, `n3`.
pub fn element_indices(n1: i64, n2: i64, n3: i64) -> [usize; 3] {
    [
        table_index(n1, 1),
        table_index(n1 + n2, 2),
        table_index(n1 + n2 + n3, 3),
    ]
}

/// Map three normalized numbers to their elements.
pub fn map_elements(n1: i64, n2: i64, n3: i64) -> ElementResult {
    let [a, b, c] = element_indices(n1, n2, n3);
    ElementResult {
        first: ELEMENTS[a],
        second: ELEMENTS[b],
        third: ELEMENTS[c],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ones_map_to_first_entry() {
        let result = map_elements(1, 1, 1);
        assert_eq!(result.labels(), ["大安=1东方木青龙"; 3]);
    }

    #[test]
    fn cumulative_indices() {
        assert_eq!(element_indices(5, 3, 2), [4, 6, 7]);
        let result = map_elements(5, 3, 2);
        assert_eq!(result.first, ELEMENTS[4]);
        assert_eq!(result.second, ELEMENTS[6]);
        assert_eq!(result.third, ELEMENTS[7]);
        assert_eq!(result.second.name, "病符");
    }

    #[test]
    fn zero_inputs_wrap_to_last_entry() {
        assert_eq!(element_indices(0, 0, 0), [8, 7, 6]);
        assert_eq!(map_elements(0, 1, 1).first.name, "天德");
    }

    #[test]
    fn large_inputs_stay_in_bounds() {
        let [a, b, c] = element_indices(9_999, 9_999, 9_999);
        assert!(a < 9 && b < 9 && c < 9);
        assert_eq!(element_indices(-20, 3, 0)[0], (-21i64).rem_euclid(9) as usize);
    }

    #[test]
    fn labels_match_decoded_fields() {
        for e in ELEMENTS.iter() {
            assert!(e.label.starts_with(e.name));
            let expected = format!("{}={}{}{}{}", e.name, e.numeral, e.direction, e.phase, e.guardian);
            assert_eq!(e.label, expected);
        }
    }

    #[test]
    fn display_joins_labels() {
        let text = map_elements(2, 1, 1).to_string();
        assert_eq!(text, "留连=2西南木青龙 / 留连=2西南木青龙 / 留连=2西南木青龙");
    }
}
