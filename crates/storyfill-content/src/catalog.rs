//! Character pool and option lists.

/// Slot that defers to a random character draw when picked.
pub const WILDCARD: &str = "🎲 ကံစမ်း";

/// Character names shared by every character question of a session.
pub const CHARACTERS: [&str; 40] = [
    "Aye Thinn Kyu",
    "Aye Myat Swe",
    "Aye Sin Sin Lin",
    "Alvina Mine",
    "Aung Khant Kyaw",
    "Aye Chan Ko Ko",
    "Chifuu",
    "Chuu",
    "Dora Honey",
    "Emilymore",
    "Gon Freecss",
    "Htet Lae Mon Soe",
    "Htet Wai Yan",
    "AhHnin",
    "Jel Jel",
    "Kyaw Thiha Phyo",
    "Kyaw Htut Lynn",
    "Kyaw Su Thawy",
    "Kay Kabyar",
    "Kaythari",
    "Lone",
    "Luneth",
    "Nang Shwe Yamin Oo",
    "Nay Ma Nyo",
    "May Myat Noe Khin",
    "Myo Zarni Kyaw",
    "Myat Min Thar",
    "Maung Kaung",
    "Myat Thura Kyaw",
    "Puddin",
    "Phyoei",
    "PhoneMyat Hein",
    "Sai Sai",
    "Thura Kaung Maw",
    "Taffy",
    "Wint",
    "Wyatt",
    "Yu Ya Hlaing",
    "Ya Mone",
    "Zue May Thaw",
];

pub(crate) const WHEN_OPTIONS: [&str; 10] = [
    "မင်္ဂလာမဆောင်ခင်ငါးမိနစ်အလို",
    "အကင်ကင်နေတဲ့အချိန်",
    "ထမင်းစားနေတဲ့အချိန်",
    "ညသန်းခေါင်ယံအချိန်",
    "ကြယ်ကြွေတဲ့အချိန်",
    "ငလျင်လှုပ်တဲ့အချိန်",
    "အိပ်ယာမဝင်ခင်အချိန်",
    "ဘုရားကန်တော့နေတဲ့အချိန်",
    "အာသာဖြေနေတဲ့အချိန်",
    "ဝမ်းချုပ်နေတဲ့အချိန်",
];

pub(crate) const WHERE_OPTIONS: [&str; 10] = [
    "အာကာသယာဥ်ပျံပေါ်မှာ",
    "အိမ်သာထဲမှာ",
    "တောင်ပေါ်မှာ",
    "သစ်ပင်ပေါ်မှာ",
    "မိလ္လာကြွင်းနံဘေးမှာ",
    "စတိတ်စင်ပေါ်မှာ",
    "ကုတင်ပေါ်မှာ",
    "ဆိုက်ကားပေါ်မှာ",
    "အစည်းအဝေးမှာ",
    "အလုပ်ထဲမှာ",
];

pub(crate) const WHY_OPTIONS: [&str; 10] = [
    "ချီးထွက်ကျတဲ့အကြောင်း",
    "ကိုယ်ဝန်ရတဲ့အကြောင်း",
    "ရေထပြုတ်ကျတဲ့အကြောင်း",
    "ခွေးကိုက်ခံရတဲ့အကြောင်း",
    "အိမ်သာတက်ရင်းလူမိတဲ့အကြောင်း",
    "ဒုတိယလူဖြစ်ခဲ့ရတဲ့အကြောင်း",
    "အမူးလွန်တဲ့အကြောင်း",
    "အငြင်းခံရတဲ့အကြောင်း",
    "အချစ်ဟောင်းကိုသတိရကြောင်း",
    "အတွင်းခံပြဲနေကြောင်း",
];

pub(crate) const HOW_SAID_OPTIONS: [&str; 10] = [
    "အိမ်သာတက်ရင်းပြောတယ်",
    "ရေကူးရင်းပြောတယ်",
    "နွားကျောင်းရင်းပြောတယ်",
    "Pronကြည့်ရင်းပြောတယ်",
    "ဘီယာသောက်ရင်းပြောတယ်",
    "ထမင်းစားရင်းပြောတယ်",
    "နှပ်ချီးနှိုက်ရင်းပြောတယ်",
    "ဘလော့ထားတဲ့အကောင့်လေးရှာရင်းပြောတယ်",
    "ငါးမျှားရင်းပြောတယ်",
    "ငိုရင်းပြောတယ်",
];

pub(crate) const DOING_WHAT_OPTIONS: [&str; 10] = [
    "ဖတ်နမ်းပြီး",
    "နေဝင်ချိန်ကိုကြည့်ပြီး",
    "ချီးစားကြပြီး",
    "ဟင်းချက်ပြီး",
    "အိမ်စာလုပ်ကြပြီး",
    "နိုဘူးစိုကြပြီး",
    "ခွေးကျောင်းကြရင်း",
    "ရေငုတ်ပြိုင်ကြရင်း",
    "အိပ်ကြရင်း",
    "လမ်းခွဲလိုက်ကြရင်း",
];
