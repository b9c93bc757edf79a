// Static fact panels shown by the shell and the `facts` command


use console::{Alignment, measure_text_width, pad_str, style};

pub const FOCUS_FIGHTER: &str = "Rabindra Dhant";
pub const OPPONENT: &str = "Chungreng Koren";

const MIND_MAP_ROOT: &str = "Rabindra Dhant: Nepali MMA Champion";
const MAX_LABEL_CHARS: usize = 60;

/// Rows of `(attribute, focus fighter, opponent)`
pub const FIGHTER_COMPARISON: &[(&str, &str, &str)] = &[
    ("Nationality", "Nepalese", "Indian"),
    ("Nickname", "The Tiger of Bajhang", "The Indian Rhino"),
    ("Age", "26 years, 8 months, 3 days", "27 years, 6 months, 1 day"),
    ("Height", "5'9\" (175cm)", "5'8\" (173cm)"),
    (
        "Team",
        "Lock N Roll MMA Nepal / Soma Fight Club Bali",
        "Warrior's Cove Mixed Martial Arts",
    ),
    ("Record", "8-1-0", "7-1-0"),
    ("Win %", "88.9%", "87.5%"),
    ("Win Prediction", "65%", "35%"),
];

pub const QUICK_FACTS: &[&str] = &[
    "Rabindra Dhant is Nepal's first MFN Bantamweight Champion. He secured the title at Matrix Fight Night 17 in August 2025, defeating India's Chungreng Koren by TKO in the third round.",
    "He refused an offer of Indian citizenship after winning a national-level amateur MMA championship in India at age 18 in 2019, choosing to keep representing Nepal even though Nepal had no official MMA association at the time.",
    "His early life involved manual labor in India after leaving his village in Bajhang at 16, where he secretly began martial arts training.",
    "Diwiz Piya Lama, a seasoned Jiu-Jitsu practitioner, met Dhant around 2021 in Kathmandu and has personally funded his training. Dhant trains at Lock N Roll MMA Nepal and Soma Fight Club in Bali.",
    "MMA's popularity is growing in Nepal. Dhant's victories have drawn massive public support despite a lack of infrastructure and government backing.",
];

pub const SAMPLE_PROMPTS: &[&str] = &[
    "Tell me about Rabindra Dhant's background and his early struggles.",
    "What was the significance of Rabindra Dhant's refusal of Indian citizenship?",
];

pub const QUICK_QUESTIONS: &[&str] = &[
    "Tell me about Rabindra Dhant's background",
    "What was the significance of his refusal of Indian citizenship?",
    "Who is his coach and mentor?",
    "How popular is MMA in Nepal?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FightEvent {
    pub event: &'static str,
    pub date: &'static str,
    pub location: &'static str,
    pub winner: &'static str,
    pub method: &'static str,
    pub round: &'static str,
    pub time: &'static str,
}

pub const FIGHT_EVENT: FightEvent = FightEvent {
    event: "Matrix Fight Night 17 (MFN 17)",
    date: "August 2, 2025",
    location: "Greater Noida, India",
    winner: "Rabindra Dhant",
    method: "KO/TKO (Punches)",
    round: "Round 3",
    time: "0:53",
};

const MIND_MAP_BRANCHES: &[(&str, &[&str])] = &[
    (
        "Background",
        &[
            "Born: November 30, 1998, Bajhang District, Nepal",
            "Early life: Manual laborer in India (Pithoragarh, New Delhi)",
            "Initial training: Karate, then transitioned to MMA",
            "Nickname: The Tiger of Bajhang",
            "Nationality: Nepalese (refused Indian citizenship offer)",
        ],
    ),
    (
        "Professional Career",
        &[
            "Record: 9 wins, 1 loss (7 KO/TKO, 1 Submission, 1 Decision)",
            "Notable fights: MFN Bantamweight Championship win vs Chungreng Koren",
            "Fight locations: India, China, Thailand, Nepal",
            "Current streak: 3 wins",
        ],
    ),
    (
        "Training & Support",
        &[
            "Current gym: Soma Fight Club, Bali (Indonesia)",
            "Previous training: Lock N Roll MMA, Kathmandu",
            "Mentorship: Coach Diwiz Piya Lama",
            "Sponsorship & finances: Supported by Nutrition Fit Nepali and Latido",
        ],
    ),
    (
        "Challenges & Mindset",
        &[
            "Height initially self-conscious for volleyball",
            "Citizenship barriers for international fights",
            "Financial struggles, lack of institutional support",
            "Family pressure to find stable job",
            "Intense training (2-3 times/day), body aches normal",
            "Mental toughness & discipline emphasized by coaches",
            "Focus on fighting itself to handle pressure",
            "Avoids social media distractions during fight week",
            "Finds peace in Nepali village vlogs",
            "Prefers not to watch other fights before bouts",
            "Goal: UFC World Champion (target age 33-34)",
        ],
    ),
    (
        "Impact & Recognition",
        &[
            "Widespread recognition in Nepal (public, media, political leaders)",
            "Milestone for combat sports in Nepal",
            "Congratulated by Prime Minister K.P. Sharma Oli and others",
            "Inspires young Nepali athletes",
            "Helped popularize MMA in Nepal",
            "Role model: humble, disciplined, respectful",
        ],
    ),
    (
        "MMA in Nepal",
        &[
            "Growing popularity over last 5 years",
            "Nepal Warriors Championship (NWC): platform for local fighters",
            "Challenges: dearth of players, lack of proper facilities, minimal government support",
            "High prices for gyms/ facilities in Kathmandu (~4.5-5K NPR/month)",
            "No official governing body for MMA as of 2019",
            "Emphasizes discipline, perseverance, and hard work",
        ],
    ),
    (
        "Controversy",
        &[
            "Warriors Cove (Chungreng's team) claimed Koren had leg issues before MFN 17",
            "Coach Mike (Dhant's coach) strongly denied excuses, blaming Indian MMA culture",
            "Highlighted Dhant fought with an MCL tear, not wrestling for 6 weeks",
            "Warriors Cove criticized for inconsistent weight management",
            "Dhant outclassed opponent in wrestling, striking, grappling",
            "No rematch deserved due to Warriors Cove's lack of accountability",
            "Emphasis on humility and learning from losses for growth",
        ],
    ),
];

/// Career highlights as a rooted tree: root, seven branches, one leaf per fact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MindMap {
    pub root: String,
    pub branches: Vec<(String, Vec<String>)>,
}

impl MindMap {
    #[inline]
    pub fn node_count(&self) -> usize {
        1 + self
            .branches
            .iter()
            .map(|(_, leaves)| 1 + leaves.len())
            .sum::<usize>()
    }

    /// Every node except the root has exactly one incoming edge
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.node_count() - 1
    }

    #[inline]
    pub fn render(&self) -> String {
        let mut lines = vec![style(&self.root).bold().to_string()];
        for (index, (branch, leaves)) in self.branches.iter().enumerate() {
            let last_branch = index + 1 == self.branches.len();
            let (branch_marker, indent) = if last_branch {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            lines.push(format!("{}{}", branch_marker, style(branch).yellow()));

            for (leaf_index, leaf) in leaves.iter().enumerate() {
                let leaf_marker = if leaf_index + 1 == leaves.len() {
                    "└── "
                } else {
                    "├── "
                };
                lines.push(format!("{}{}{}", indent, leaf_marker, leaf));
            }
        }
        lines.join("\n")
    }
}

/// Labels longer than 60 characters are cut to 60 and suffixed with `...`
#[inline]
pub fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        label.to_string()
    } else {
        let mut truncated: String = label.chars().take(MAX_LABEL_CHARS).collect();
        truncated.push_str("...");
        truncated
    }
}

#[inline]
pub fn build_mind_map() -> MindMap {
    MindMap {
        root: MIND_MAP_ROOT.to_string(),
        branches: MIND_MAP_BRANCHES
            .iter()
            .map(|(branch, leaves)| {
                (
                    (*branch).to_string(),
                    leaves.iter().map(|leaf| truncate_label(leaf)).collect(),
                )
            })
            .collect(),
    }
}

#[inline]
pub fn render_comparison_table() -> String {
    let header = ("Attribute", FOCUS_FIGHTER, OPPONENT);
    let rows = std::iter::once(header).chain(FIGHTER_COMPARISON.iter().copied());

    let mut widths = [0usize; 3];
    for (attribute, focus, opponent) in rows.clone() {
        for (slot, text) in widths.iter_mut().zip([attribute, focus, opponent]) {
            *slot = (*slot).max(measure_text_width(text));
        }
    }

    let mut lines = Vec::with_capacity(FIGHTER_COMPARISON.len() + 2);
    for (index, (attribute, focus, opponent)) in rows.enumerate() {
        let line = format!(
            "{} │ {} │ {}",
            pad_str(attribute, widths[0], Alignment::Left, None),
            pad_str(focus, widths[1], Alignment::Left, None),
            pad_str(opponent, widths[2], Alignment::Left, None)
        );
        if index == 0 {
            lines.push(style(line).bold().to_string());
            lines.push(format!(
                "{}─┼─{}─┼─{}",
                "─".repeat(widths[0]),
                "─".repeat(widths[1]),
                "─".repeat(widths[2])
            ));
        } else {
            lines.push(line);
        }
    }
    lines.join("\n")
}

#[inline]
pub fn render_fight_event() -> String {
    let event = FIGHT_EVENT;
    format!(
        "{}\n\nDate: {}\nLocation: {}\n\nFight Result:\n  Winner: {}\n  Method: {}\n  Round: {}\n  Time: {}",
        style(event.event).bold(),
        event.date,
        event.location,
        event.winner,
        event.method,
        event.round,
        event.time
    )
}

fn render_bullets(items: &[&str]) -> String {
    items
        .iter()
        .map(|item| format!("  • {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[inline]
pub fn render_quick_facts() -> String {
    format!(
        "{}\n{}",
        style("Key Highlights:").bold(),
        render_bullets(QUICK_FACTS)
    )
}

#[inline]
pub fn render_sample_prompts() -> String {
    format!(
        "{}\n{}",
        style("Ask me about:").bold(),
        render_bullets(SAMPLE_PROMPTS)
    )
}

/// Every panel, separated by blank lines
#[inline]
pub fn render_all() -> String {
    let mind_map = build_mind_map();
    [
        render_comparison_table(),
        render_fight_event(),
        render_quick_facts(),
        render_sample_prompts(),
        mind_map.render(),
        format!(
            "Mind map: {} nodes, {} edges",
            mind_map.node_count(),
            mind_map.edge_count()
        ),
    ]
    .join("\n\n")
}
