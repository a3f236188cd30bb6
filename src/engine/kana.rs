use std::collections::HashMap;
use std::sync::LazyLock;

use super::verdict::DigraphMatch;

/// Romaji spellings and the hiragana they produce. Upper-case spellings
/// produce katakana and are derived from this table.
#[rustfmt::skip]
const ROMAJI_TABLE: &[(&str, &str)] = &[
    ("a", "あ"), ("i", "い"), ("u", "う"), ("e", "え"), ("o", "お"), ("ka", "か"),
    ("ga", "が"), ("ki", "き"), ("gi", "ぎ"), ("ku", "く"), ("gu", "ぐ"), ("ke", "け"),
    ("ge", "げ"), ("ko", "こ"), ("go", "ご"), ("ca", "か"), ("ci", "き"), ("cu", "く"),
    ("ce", "け"), ("co", "こ"), ("sa", "さ"), ("za", "ざ"), ("shi", "し"), ("si", "し"),
    ("ji", "じ"), ("zi", "じ"), ("su", "す"), ("zu", "ず"), ("se", "せ"), ("ze", "ぜ"),
    ("so", "そ"), ("zo", "ぞ"), ("ta", "た"), ("da", "だ"), ("chi", "ち"), ("ti", "ち"),
    ("di", "ぢ"), ("tsu", "つ"), ("tu", "つ"), ("du", "づ"), ("te", "て"), ("de", "で"),
    ("to", "と"), ("do", "ど"), ("ltu", "っ"), ("xtu", "っ"), ("ltsu", "っ"), ("na", "な"),
    ("ni", "に"), ("nu", "ぬ"), ("ne", "ね"), ("no", "の"), ("ha", "は"), ("ba", "ば"),
    ("pa", "ぱ"), ("hi", "ひ"), ("bi", "び"), ("pi", "ぴ"), ("fu", "ふ"), ("hu", "ふ"),
    ("bu", "ぶ"), ("pu", "ぷ"), ("he", "へ"), ("be", "べ"), ("pe", "ぺ"), ("ho", "ほ"),
    ("bo", "ぼ"), ("po", "ぽ"), ("ma", "ま"), ("mi", "み"), ("mu", "む"), ("me", "め"),
    ("mo", "も"), ("ya", "や"), ("yu", "ゆ"), ("yo", "よ"), ("xya", "ゃ"), ("xyu", "ゅ"),
    ("xyo", "ょ"), ("ra", "ら"), ("ri", "り"), ("ru", "る"), ("re", "れ"), ("ro", "ろ"),
    ("la", "ら"), ("li", "り"), ("lu", "る"), ("le", "れ"), ("lo", "ろ"), ("wa", "わ"),
    ("wo", "を"), ("lwe", "ゎ"), ("xwa", "ゎ"), ("nn", "ん"), ("n ", "ん"), ("xn", "ん"),
    ("kya", "きゃ"), ("kyu", "きゅ"), ("kyo", "きょ"), ("gya", "ぎゃ"), ("gyu", "ぎゅ"), ("gyo", "ぎょ"),
    ("qya", "くゃ"), ("qyu", "くゅ"), ("qyo", "くょ"), ("sha", "しゃ"), ("shya", "しゃ"), ("sya", "しゃ"),
    ("shu", "しゅ"), ("shyu", "しゅ"), ("syu", "しゅ"), ("sho", "しょ"), ("shyo", "しょ"), ("syo", "しょ"),
    ("zya", "じゃ"), ("zyu", "じゅ"), ("zyo", "じょ"), ("ja", "じゃ"), ("ju", "じゅ"), ("jo", "じょ"),
    ("jya", "じゃ"), ("jyu", "じゅ"), ("jyo", "じょ"), ("cha", "ちゃ"), ("cya", "ちゃ"), ("chya", "ちゃ"),
    ("tya", "ちゃ"), ("chu", "ちゅ"), ("cyu", "ちゅ"), ("chyu", "ちゅ"), ("tyu", "ちゅ"), ("cho", "ちょ"),
    ("cyo", "ちょ"), ("chyo", "ちょ"), ("tyo", "ちょ"), ("dya", "ぢゃ"), ("dyu", "ぢゅ"), ("dyo", "ぢょ"),
    ("tha", "てゃ"), ("thu", "てゅ"), ("tho", "てょ"), ("dha", "でゃ"), ("dhu", "でゅ"), ("dho", "でょ"),
    ("nya", "にゃ"), ("nyu", "にゅ"), ("nyo", "にょ"), ("hya", "ひゃ"), ("hyu", "ひゅ"), ("hyo", "ひょ"),
    ("bya", "びゃ"), ("byu", "びゅ"), ("byo", "びょ"), ("pya", "ぴゃ"), ("pyu", "ぴゅ"), ("pyo", "ぴょ"),
    ("fya", "ふゃ"), ("fyu", "ふゅ"), ("fyo", "ふょ"), ("mya", "みゃ"), ("myu", "みゅ"), ("myo", "みょ"),
    ("rya", "りゃ"), ("ryu", "りゅ"), ("ryo", "りょ"), ("lya", "りゃ"), ("lyu", "りゅ"), ("lyo", "りょ"),
    ("vya", "ゔゃ"), ("vyu", "ゔゅ"), ("vyo", "ゔょ"), ("ye", "いぇ"), ("wha", "うぁ"), ("whi", "うぃ"),
    ("whe", "うぇ"), ("who", "うぉ"), ("wi", "うぃ"), ("we", "うぇ"), ("kyi", "きぃ"), ("kye", "きぇ"),
    ("qwa", "くぁ"), ("qwi", "くぃ"), ("qwu", "くぅ"), ("qwe", "くぇ"), ("qwo", "くぉ"), ("qa", "くぁ"),
    ("qi", "くぃ"), ("qe", "くぇ"), ("qo", "くぉ"), ("kwa", "くぁ"), ("qyi", "くぃ"), ("qye", "くぇ"),
    ("gyi", "ぎぃ"), ("gye", "ぎぇ"), ("gwa", "ぐぁ"), ("gwi", "ぐぃ"), ("gwu", "ぐぅ"), ("gwe", "ぐぇ"),
    ("gwo", "ぐぉ"), ("syi", "しぃ"), ("sye", "しぇ"), ("she", "しぇ"), ("shye", "しぇ"), ("zyi", "じぃ"),
    ("zye", "じぇ"), ("je", "じぇ"), ("jyi", "じぃ"), ("jye", "じぇ"), ("swa", "すぁ"), ("swi", "すぃ"),
    ("swu", "すぅ"), ("swe", "すぇ"), ("swo", "すぉ"), ("che", "ちぇ"), ("cyi", "ちぃ"), ("cye", "ちぇ"),
    ("tyi", "ちぃ"), ("tye", "ちぇ"), ("chye", "ちぇ"), ("dyi", "ぢぃ"), ("dye", "ぢぇ"), ("tsa", "つぁ"),
    ("tsi", "つぃ"), ("tse", "つぇ"), ("tso", "つぉ"), ("thi", "てぃ"), ("the", "てぇ"), ("twa", "とぁ"),
    ("twi", "とぃ"), ("twu", "とぅ"), ("twe", "とぇ"), ("two", "とぉ"), ("dhi", "でぃ"), ("dhe", "でぇ"),
    ("dwa", "どぁ"), ("dwi", "どぃ"), ("dwu", "どぅ"), ("dwe", "どぇ"), ("dwo", "どぉ"), ("nyi", "にぃ"),
    ("nye", "にぇ"), ("hyi", "ひぃ"), ("hye", "ひぇ"), ("fwa", "ふぁ"), ("fwi", "ふぃ"), ("fwu", "ふぅ"),
    ("fwe", "ふぇ"), ("fwo", "ふぉ"), ("fa", "ふぁ"), ("fi", "ふぃ"), ("fe", "ふぇ"), ("fo", "ふぉ"),
    ("fyi", "ふぃ"), ("fye", "ふぇ"), ("byi", "びぃ"), ("bye", "びぇ"), ("pyi", "ぴぃ"), ("pye", "ぴぇ"),
    ("myi", "みぃ"), ("mye", "みぇ"), ("ryi", "りぃ"), ("rye", "りぇ"), ("lyi", "りぃ"), ("lye", "りぇ"),
    ("ve", "ゔぇ"), ("vo", "ゔぉ"), ("vyi", "ゔぃ"), ("vye", "ゔぇ"), ("va", "ゔぁ"), ("vi", "ゔぃ"),
    ("yi", "い"), ("wu", "う"), ("whu", "う"), ("xa", "ぁ"), ("xi", "ぃ"), ("xu", "ぅ"),
    ("xe", "ぇ"), ("xo", "ぉ"), ("xyi", "ぃ"), ("xye", "ぇ"), ("vu", "ゔ"), ("lka", "ゕ"),
    ("lke", "ゖ"), ("xka", "ゕ"), ("xke", "ゖ"), ("lca", "ゕ"), ("lce", "ゖ"), ("xca", "ゕ"),
    ("xce", "ゖ"), ("-", "ー"),   
];

static KANA_MAP: LazyLock<HashMap<String, String>> = LazyLock::new(|| {
    let mut map = HashMap::with_capacity(ROMAJI_TABLE.len() * 2);
    for &(romaji, kana) in ROMAJI_TABLE {
        map.insert(romaji.to_string(), kana.to_string());
    }
    for &(romaji, kana) in ROMAJI_TABLE {
        map.insert(romaji.to_uppercase(), to_katakana(kana));
    }
    map
});

const SMALL_KANA: &str = "ぁぃぅぇぉっゃゅょゎゕゖァィゥェォッャュョヮヵヶ";
const REGULAR_KANA: &str = "あいうえおつやゆよわかけアイウエオツヤユヨワカケ";

pub fn to_katakana(hiragana: &str) -> String {
    hiragana
        .chars()
        .map(|c| match c {
            '\u{3040}'..='\u{3096}' => char::from_u32(c as u32 + 0x60).unwrap_or(c),
            _ => c,
        })
        .collect()
}

pub fn is_kana(c: char) -> bool {
    ('\u{3040}'..='\u{30FF}').contains(&c)
}

/// Rewrite romaji in `chars[start..end]` to kana in place, the way a
/// romaji IME does while typing. Anything that is not romaji is kept.
pub fn fixup(chars: &mut Vec<char>, start: usize, end: usize) {
    let mut start = start;
    let mut end = end.min(chars.len());

    while start < end {
        if start > 0 {
            let c1 = chars[start - 1];
            let c2 = chars[start];
            if c1 == 'n' && !"aiueoyn ".contains(c2) {
                chars[start - 1] = 'ん';
                continue;
            }
            if c1 == c2 && "bcdfghjklmpqrstvwxz".contains(c1) {
                chars[start - 1] = 'っ';
                continue;
            }
        }

        let mut replaced = false;
        for i in start.saturating_sub(3)..=start {
            let key: String = chars[i..=start].iter().collect();
            if let Some(kana) = KANA_MAP.get(&key) {
                let kana: Vec<char> = kana.chars().collect();
                let len = kana.len();
                chars.splice(i..=start, kana);
                end = (end + len - (start + 1 - i)).min(chars.len());
                start = i + len;
                replaced = true;
                break;
            }
        }
        if replaced {
            continue;
        }

        if chars[start].is_whitespace() {
            chars.remove(start);
            end -= 1;
            continue;
        }

        start += 1;
    }
}

/// Convert a complete romaji answer to kana. A trailing `n` becomes ん.
pub fn romaji_to_kana(input: &str) -> String {
    let mut chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    fixup(&mut chars, 0, len);
    if let Some(last) = chars.last_mut().filter(|c| **c == 'n') {
        *last = 'ん';
    }
    chars.into_iter().collect()
}

fn small_pair(a: char, b: char) -> Option<(char, char)> {
    let small: Vec<char> = SMALL_KANA.chars().collect();
    let regular: Vec<char> = REGULAR_KANA.chars().collect();
    (0..small.len()).find_map(|i| {
        if (a == regular[i] && b == small[i]) || (a == small[i] && b == regular[i]) {
            Some((regular[i], small[i]))
        } else {
            None
        }
    })
}

/// Detect a regular/small kana mixup between `answer` and `reading`: the two
/// have equal length and every differing position is such a pair. Reports
/// the last pair found.
pub fn digraph_match(answer: &str, reading: &str) -> Option<DigraphMatch> {
    let answer: Vec<char> = answer.chars().collect();
    let reading: Vec<char> = reading.chars().collect();
    if answer.len() != reading.len() {
        return None;
    }
    let mut found = None;
    for (&a, &r) in answer.iter().zip(&reading) {
        if a == r {
            continue;
        }
        let (regular_kana, small_kana) = small_pair(a, r)?;
        found = Some(DigraphMatch { regular_kana, small_kana });
    }
    found
}
