//! Built-in rule table for the school's chat widget

use super::ChatRule;

pub const FALLBACK: &str = "לא בטוח שהבנתי 🙂 אפשר לשאול אותי על הקורסים (מיינקראפט, רובלוקס, פייתון, פיתוח אתרים, בינה מלאכותית), על מחירים, גילאים ומערכת השעות, או להשאיר פרטים ונחזור אליכם.";

pub const MINECRAFT_RESPONSE: &str = "קורס מיינקראפט שלנו מלמד תכנות דרך בניית מודים ועולמות במיינקראפט. מתאים לגילאי 7-12, בקבוצות קטנות אונליין. רוצים לשמוע על שיעור ניסיון?";

const ROBLOX_RESPONSE: &str = "בקורס רובלוקס הילדים בונים משחקים משלהם ב-Roblox Studio ולומדים לתכנת ב-Lua. מתאים לגילאי 9-14.";

const PYTHON_RESPONSE: &str = "קורס פייתון הוא הצעד הבא לתכנות אמיתי: משתנים, לולאות, פונקציות ופרויקטים קטנים. מתאים לגילאי 11 ומעלה.";

const WEB_RESPONSE: &str = "בקורס פיתוח אתרים לומדים HTML, CSS ו-JavaScript ובונים אתר אישי מאפס. מתאים לגילאי 12 ומעלה.";

const AI_RESPONSE: &str = "בקורס הבינה המלאכותית מכירים מודלים, צ'אטבוטים ויצירת תמונות, ובונים פרויקט AI ראשון. מתאים לגילאי 10 ומעלה.";

const PRICE_RESPONSE: &str = "מחיר קורס מלא הוא 497 ₪ וכולל גישה לכל השיעורים, החידונים והמנטור. לפעמים יש קופוני הנחה, אפשר להזין קוד בעמוד התשלום.";

const AGE_RESPONSE: &str = "הקורסים שלנו מיועדים לילדים ונוער בגילאי 7-16. נשמח להמליץ על קורס לפי הגיל והניסיון של הילד.";

const SCHEDULE_RESPONSE: &str = "כל השיעורים מתקיימים אונליין בזום, פעם בשבוע אחר הצהריים, ויש גם הקלטות לצפייה בכל זמן.";

const CONTACT_RESPONSE: &str = "אפשר להשאיר שם ומספר טלפון בטופס באתר ונחזור אליכם בהקדם, או לכתוב לנו בוואטסאפ.";

const GREETING_RESPONSE: &str = "שלום! 👋 אני הבוט של בית הספר לתכנות. על איזה קורס תרצו לשמוע?";

/// Ordered (pattern, response) pairs. Order is significant.
const RULES: &[(&str, &str)] = &[
    (r"מיינקראפט|מיינקרפט|minecraft", MINECRAFT_RESPONSE),
    (r"רובלוקס|roblox", ROBLOX_RESPONSE),
    (r"פייתון|פיתון|python", PYTHON_RESPONSE),
    (r"אתרים|אתר|\bweb|website|html|css|javascript|\bjs\b", WEB_RESPONSE),
    (r"בינה מלאכותית|\bai\b|צ'אט ?gpt|chatgpt", AI_RESPONSE),
    (r"מחיר|עולה|עלות|כמה זה|תשלום|price|cost", PRICE_RESPONSE),
    (r"גיל|בן כמה|בת כמה|ילד|ילדה|\bages?\b", AGE_RESPONSE),
    (r"מתי|שעות|זום|אונליין|פרונטלי|schedule|zoom", SCHEDULE_RESPONSE),
    (r"טלפון|וואטסאפ|ווטסאפ|ליצור קשר|צור קשר|contact|phone", CONTACT_RESPONSE),
    (r"^(שלום|היי|הי|hello|hi|hey)\b", GREETING_RESPONSE),
];

pub fn default_rules() -> Vec<ChatRule> {
    RULES
        .iter()
        .filter_map(|(pattern, response)| match ChatRule::new(pattern, *response) {
            Ok(rule) => Some(rule),
            Err(e) => {
                tracing::error!("Skipping built-in chat rule: {}", e);
                None
            }
        })
        .collect()
}
