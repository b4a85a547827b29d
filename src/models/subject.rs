use phf::phf_map;

/// 科目枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    /// 国語
    Jp,
    /// 算数
    Math,
    /// 理科
    Sci,
    /// 社会
    Soc,
}

impl Subject {
    /// 获取科目代码
    pub fn code(self) -> &'static str {
        match self {
            Subject::Jp => "jp",
            Subject::Math => "math",
            Subject::Sci => "sci",
            Subject::Soc => "soc",
        }
    }

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Subject::Jp => "国語",
            Subject::Math => "算数",
            Subject::Sci => "理科",
            Subject::Soc => "社会",
        }
    }

    /// 从代码解析科目
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "jp" => Some(Subject::Jp),
            "math" => Some(Subject::Math),
            "sci" => Some(Subject::Sci),
            "soc" => Some(Subject::Soc),
            _ => None,
        }
    }

    /// 从分类ID前缀解析科目（`JP` / `MA` / `SC` / `SO`）
    pub fn from_genre_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "JP" => Some(Subject::Jp),
            "MA" => Some(Subject::Math),
            "SC" => Some(Subject::Sci),
            "SO" => Some(Subject::Soc),
            _ => None,
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// 未知科目的代码
pub const UNKNOWN_SUBJECT: &str = "unknown";

static BUILTIN_GENRES: phf::Map<&'static str, &'static str> = phf_map! {
    // 国語
    "JP01" => "漢字・語彙", "JP02" => "文法・言葉のきまり", "JP03" => "物語文読解",
    "JP04" => "説明文・論説文読解", "JP05" => "随筆文読解", "JP06" => "詩・韻文",
    "JP07" => "記述問題", "JP08" => "知識・文学史",
    // 算数
    "MA01" => "計算", "MA02" => "数の性質", "MA03" => "割合・比", "MA04" => "速さ",
    "MA05" => "文章題（その他）", "MA06" => "平面図形", "MA07" => "立体図形",
    "MA08" => "場合の数・確率", "MA09" => "グラフ・表", "MA10" => "特殊算",
    // 理科
    "SC01" => "力・運動", "SC02" => "電気", "SC03" => "光・音・熱", "SC04" => "物質の性質",
    "SC05" => "水溶液", "SC06" => "燃焼・化学変化", "SC07" => "植物", "SC08" => "動物",
    "SC09" => "人体", "SC10" => "天体", "SC11" => "気象", "SC12" => "地学",
    // 社会
    "SO01" => "日本地理（国土・自然）", "SO02" => "日本地理（産業）", "SO03" => "世界地理",
    "SO04" => "歴史（古代〜平安）", "SO05" => "歴史（鎌倉〜室町）", "SO06" => "歴史（安土桃山〜江戸）",
    "SO07" => "歴史（明治〜現代）", "SO08" => "公民（政治・憲法）", "SO09" => "公民（経済・国際）",
    "SO10" => "時事問題",
};

/// 分类目录：分类ID → 分类名称、分类ID → 科目
///
/// 只读表，由调用方显式传入，不作为全局可变状态使用。
#[derive(Debug, Clone, Copy)]
pub struct GenreCatalog {
    genres: &'static phf::Map<&'static str, &'static str>,
}

impl GenreCatalog {
    /// 内置分类表
    pub fn builtin() -> Self {
        Self {
            genres: &BUILTIN_GENRES,
        }
    }

    /// 分类名称，不存在时回退为分类ID本身
    pub fn genre_name<'a>(&self, genre_id: &'a str) -> &'a str {
        match self.genres.get(genre_id) {
            Some(name) => *name,
            None => genre_id,
        }
    }

    /// 是否为已知分类
    pub fn contains(&self, genre_id: &str) -> bool {
        self.genres.contains_key(genre_id)
    }

    /// 由分类ID前两位确定科目
    pub fn subject_for(&self, genre_id: &str) -> Option<Subject> {
        genre_id.get(..2).and_then(Subject::from_genre_prefix)
    }

    /// 科目代码，未知前缀返回 `unknown`
    pub fn subject_code(&self, genre_id: &str) -> &'static str {
        self.subject_for(genre_id)
            .map(Subject::code)
            .unwrap_or(UNKNOWN_SUBJECT)
    }
}

impl Default for GenreCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
