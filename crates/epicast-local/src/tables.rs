//! Built-in classification tables.
//!
//! Every table is an ordered slice: the declaration order decides single-label winners and the
//! order of multi-label output, so entries must not be re-sorted.

/// One (label, pattern) entry. Patterns are matched case-insensitively.
#[derive(Debug, Clone, Copy)]
pub struct PatternSpec {
    pub label: &'static str,
    pub pattern: &'static str,
    /// Literal guard: a match immediately followed by this text does not count.
    pub not_followed_by: Option<&'static str>,
}

impl PatternSpec {
    pub const fn new(label: &'static str, pattern: &'static str) -> Self {
        Self {
            label,
            pattern,
            not_followed_by: None,
        }
    }

    pub const fn unless_followed_by(mut self, guard: &'static str) -> Self {
        self.not_followed_by = Some(guard);
        self
    }
}

const fn p(label: &'static str, pattern: &'static str) -> PatternSpec {
    PatternSpec::new(label, pattern)
}

pub const JOURNALS: &[PatternSpec] = &[
    p("NEJM", r"\bNEJM\b|New England Journal"),
    p("Lancet ID", r"Lancet Infectious Diseases|Lancet ID"),
    p("Lancet", r"\bLancet\b").unless_followed_by(" ID"),
    p("JAMA Netw Open", r"JAMA Network Open"),
    p("JAMA", r"\bJAMA\b"),
    p("CID", r"Clinical Infectious Diseases|CID\b"),
    p("OFID", r"Open Forum Infectious Diseases|OFID\b"),
    p("EID", r"Emerging Infectious Diseases|EID\b"),
    p("Eurosurveillance", r"Eurosurveillance"),
    p("ICHE", r"Infection Control & Hospital Epidemiology|ICHE\b"),
    p("JHI", r"Journal of Hospital Infection|JHI\b"),
    p("IJID", r"International Journal of Infectious Diseases|IJID\b"),
    p("Journal of Infection", r"Journal of Infection").unless_followed_by(" and Chemotherapy"),
    p("J Infect Chemother", r"Journal of Infection and Chemotherapy"),
    p("NRDP", r"Nature Reviews Disease Primers"),
    p("NRevMicro", r"Nature Reviews Microbiology"),
    p("Nat Commun", r"Nature Communications"),
    p("BMJ", r"\bBMJ\b"),
    p("MMWR", r"\bMMWR\b"),
    p("BMC Medicine", r"BMC Medicine"),
];

/// Literal keywords on the raw title that force the journal field, first hit wins.
pub const JOURNAL_OVERRIDES: &[(&str, &str)] = &[
    ("IDWR", "IDWR"),
    ("感染症発生動向調査", "IDWR"),
    ("IASR", "IASR"),
    ("病原微生物検出情報", "IASR"),
    ("Disease Outbreak News", "WHO DON"),
];

/// Separators after which a trailing journal name is commonly appended to titles.
pub const JOURNAL_SEPARATORS: &[char] = &['｜', '／', '：'];

pub const PATHOGENS: &[PatternSpec] = &[
    p("COVID-19", r"COVID|SARS[- ]?CoV[- ]?2|コロナ"),
    p("インフルエンザ", r"インフル|Influenza|H5N1|HPAI"),
    p("SFTS", r"\bSFTS\b|重症熱性血小板減少症候群"),
    p("結核", r"結核|tuberculosis|M\.?\s?tuberculosis"),
    p("アスペルギルス", r"Aspergillus|アスペル"),
    p("チクングニア", r"Chikungunya|チクングニア"),
    p("デング", r"Dengue|デング"),
    p("ジカ", r"Zika|ジカ"),
    p("HIV", r"\bHIV\b|AIDS"),
    p("ペスト", r"Yersinia pestis|ペスト"),
    p("レジオネラ", r"Legionella|レジオネラ"),
    p("感染性心内膜炎", r"心内膜炎|endocarditis"),
    p("尿路感染症", r"尿路感染|UTI"),
    p("肺炎", r"肺炎|pneumoni"),
    p("菌血症/BSI", r"菌血症|BSI|bloodstream infection"),
    p("CRBSI", r"\bCRBSI\b|カテーテル関連血流感染"),
    p("黄色ブドウ球菌", r"Staphylococcus aureus|黄色ブドウ球菌|S\.?\s?aureus"),
    p("緑膿菌", r"Pseudomonas aeruginosa|緑膿菌|P\.?\s?aeruginosa"),
    p("腸球菌", r"Enterococcus|腸球菌"),
    p("CNS", r"coagulase[- ]negative staphylococci|CNS|コアグラーゼ陰性"),
    p("カンジダ", r"Candida|カンジダ"),
    p("麻疹", r"麻疹|measles"),
    p("風疹", r"風疹|rubella"),
    p("マラリア", r"malaria|マラリア|Plasmodium"),
    p("腸チフス", r"typhoid|腸チフス|Salmonella Typhi"),
    p("CRE", r"\bCRE\b|carbapenem[- ]resistant.*Enterobacter"),
    p("VRE", r"\bVRE\b|vancomycin[- ]resistant.*Enterococc"),
    p("MRSA", r"\bMRSA\b"),
    p("アシネトバクター", r"Acinetobacter|アシネト"),
    p("腸内細菌目", r"Enterobacterales|腸内細菌目"),
    p("エボラ", r"Ebola|エボラ"),
    p("日本紅斑熱", r"日本紅斑熱|Japanese Spotted Fever|Rickettsia japonica"),
    p("ツツガムシ病", r"tsutsugamushi|Orientia tsutsugamushi|ツツガムシ"),
    p("肺炎球菌", r"Streptococcus pneumoniae|肺炎球菌"),
    p("髄膜炎菌", r"Neisseria meningitidis|髄膜炎菌"),
    p("淋菌", r"Neisseria gonorrhoeae|淋菌"),
    p("クラミジア", r"Chlamydia trachomatis|クラミジア"),
    p("梅毒", r"Treponema pallidum|梅毒"),
    p("真菌", r"真菌|fungal|mycos"),
    p("帯状疱疹", r"帯状疱疹|zoster|VZV"),
    p("溶連菌", r"溶連菌|Streptococcus (?:pyogenes|agalactiae)|GAS|GBS"),
    p("かぜ", r"かぜ|風邪|common cold"),
    p("CMV", r"\bCMV\b|cytomegalovirus|サイトメガロ"),
    p("エムポックス", r"\bmpox\b|monkeypox|サル痘"),
    p("ウイルス", r"\bvirus\b|ウイルス"),
    p("SSI", r"\bSSI\b|手術部位感染|surgical site infection"),
    p("髄膜炎", r"髄膜炎|meningitis"),
    p("胆嚢炎", r"胆嚢炎|cholecystitis"),
    p("肝膿瘍", r"肝膿瘍|liver abscess"),
    p("前立腺炎", r"前立腺炎|prostatitis"),
    p("皮膚軟部組織感染症", r"皮膚|軟部|SSTI|cellulitis|膿瘍"),
    p("関節炎", r"関節炎|arthritis|化膿性関節炎"),
];

/// Topic injected by the outbreak-bulletin study-design override.
pub const EPIDEMIOLOGY_TOPIC: &str = "疫学";

pub const TOPICS: &[PatternSpec] = &[
    p("ワクチン", r"ワクチン|vaccine|immuni[sz]ation"),
    p(
        "抗菌薬",
        r"抗菌薬|antibiotic|β-?lactam|penem|cef|macrolide|doxy|fosfomycin|aminoglycoside",
    ),
    p(EPIDEMIOLOGY_TOPIC, r"疫学|epidemiolog|incidence|prevalence|trend"),
    p("診断", r"診断|NAAT|PCR|抗原|culture|迅速検査|sequenc"),
    p("感染対策", r"感染対策|手指衛生|outbreak|サーベイランス|surveillance|ICHE|JHI"),
    p(
        "抗ウイルス薬",
        r"抗ウイルス|antiviral|nirmatrelvir|favipiravir|remdesivir|oseltamivir",
    ),
    p("抗真菌薬", r"抗真菌|antifungal|azole|echinocandin|amphotericin"),
    p("抗原虫薬", r"antiprotozoal|抗原虫|chloroquine|artemisinin|tafenoquine"),
    p("病原体", r"(?:病原体|pathogen|bacteri|virus|fungi)"),
];

pub const FREE_TAGS: &[PatternSpec] = &[
    p("熱帯医学", r"マラリア|デング|チクングニア|ジカ|熱帯|tropical"),
    p("節足動物媒介感染症", r"蚊|ダニ|ベクター|vector[- ]borne|媒介"),
    p("One Health", r"One Health|動物|家畜|環境微生物"),
    p("免疫不全", r"免疫不全|immunocompromised|免疫低下"),
    p("移植", r"移植|transplant|移植後"),
    p("性感染症", r"性感|性行為感染|sexually transmitted|STI"),
    p("耐性菌", r"耐性|AMR|resistan|CRE|VRE|MRSA|ESBL|CPE"),
    p("小児", r"小児|小児科|pediatric|children"),
    p("周産期", r"妊娠|妊婦|周産期|neonat|perinatal|pregnan"),
    p("外科感染症", r"手術|術後|外科|SSI"),
    p("人工物感染症", r"カテ|人工|デバイス|プロテーゼ|留置|device|prosthe"),
    p("アウトブレイク", r"outbreak|アウトブレイク"),
    p("サーベイランス", r"surveillance|サーベイランス"),
    p("院内感染", r"healthcare[- ]associated|hospital[- ]acquired|院内感染|医療関連感染"),
    p("重症", r"severe|重症|ICU|集中治療"),
    p("高齢者", r"高齢者|elderly|older adult|高齢|frail"),
    p("妊娠", r"pregnan|妊娠|妊婦"),
];

/// Label forced by the outbreak-bulletin override.
pub const SURVEILLANCE_DESIGN: &str = "サーベイランス";

/// Titles phrased as an epidemic/outbreak bulletin.
pub const OUTBREAK_BULLETIN: &str =
    r"流行情報|発生状況|Disease Outbreak News|outbreak (?:news|update|report)|epidemic update";

pub const STUDY_DESIGNS: &[PatternSpec] = &[
    p("レビュー", r"レビュー|review|primer|overview|update"),
    p("ガイドライン", r"guideline|ガイドライン|recommendation|strategy"),
    p("RCT", r"random|無作為|第[1-4]相|phase\s?[1-4]|trial"),
    p("前向きコホート", r"前向き|prospective"),
    p("後ろ向きコホート", r"後ろ向き|retrospective"),
    p(SURVEILLANCE_DESIGN, r"サーベイランス|surveillance|registry|cohort"),
    p("症例報告", r"症例|case report|case series"),
];
