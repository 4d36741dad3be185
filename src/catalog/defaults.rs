//! Built-in catalog used when the configured source cannot be loaded.
//!
//! Sixteen items, eight per axis: three broad exploration items whose
//! options each favour two archetypes (every archetype is favoured by
//! exactly one option), three discrimination items and two confirmation
//! items whose options each favour a single archetype.

use once_cell::sync::Lazy;

use crate::archetype::Archetype::{Dui, Gen, Kan, Kun, Li, Qian, Xun, Zhen};
use crate::archetype::{Archetype, Axis, Stage, ARCHETYPE_COUNT};

use super::{Catalog, Item, ItemOption, LocalizedText, OptionKey, OPTION_COUNT};

const FAVORED: f64 = 0.85;
const PAIR_BASE: f64 = 0.2;
const SINGLE_BASE: f64 = 0.15;

type OptionRow = (&'static str, &'static str, &'static [Archetype]);

struct Row {
    id: &'static str,
    axis: Axis,
    stage: Stage,
    difficulty: f64,
    information_value: f64,
    prompt: (&'static str, &'static str),
    options: [OptionRow; OPTION_COUNT],
    targets: &'static [Archetype],
}

const ROWS: &[Row] = &[
    // -- Intrinsic motivation ------------------------------------------------
    Row {
        id: "in-x1",
        axis: Axis::Intrinsic,
        stage: Stage::Exploration,
        difficulty: 0.3,
        information_value: 0.5,
        prompt: (
            "When you start something new, what pulls you in first?",
            "开始一件新事情时，最先吸引你的是什么？",
        ),
        options: [
            ("The chance to lead it somewhere", "带领它走向某处的机会", &[Qian, Zhen]),
            ("The delight of sharing it", "与人分享的喜悦", &[Dui, Li]),
            ("The puzzle hidden inside", "其中隐藏的谜题", &[Kan, Gen]),
            ("Knowing it will help others", "知道它能帮助别人", &[Kun, Xun]),
        ],
        targets: &[],
    },
    Row {
        id: "in-x2",
        axis: Axis::Intrinsic,
        stage: Stage::Exploration,
        difficulty: 0.3,
        information_value: 0.5,
        prompt: (
            "What would make a day feel truly worthwhile?",
            "什么样的一天让你觉得真正有意义？",
        ),
        options: [
            ("I achieved something visible", "我完成了看得见的成就", &[Qian, Li]),
            ("Someone felt cared for because of me", "有人因我而感到被照顾", &[Dui, Kun]),
            ("I broke through a hard obstacle", "我突破了一个难关", &[Zhen, Kan]),
            ("I quietly refined my craft", "我静静地打磨了自己的技艺", &[Xun, Gen]),
        ],
        targets: &[],
    },
    Row {
        id: "in-x3",
        axis: Axis::Intrinsic,
        stage: Stage::Exploration,
        difficulty: 0.35,
        information_value: 0.55,
        prompt: ("Which reward matters most to you?", "哪种回报对你最重要？"),
        options: [
            ("Respect earned through mastery", "凭精通赢得的尊重", &[Qian, Gen]),
            ("Warm connection with others", "与他人温暖的联结", &[Dui, Xun]),
            ("Insight into how things work", "洞察事物运作的方式", &[Li, Kan]),
            ("A fresh start whenever I need one", "随时重新开始的自由", &[Zhen, Kun]),
        ],
        targets: &[],
    },
    Row {
        id: "in-d1",
        axis: Axis::Intrinsic,
        stage: Stage::Discrimination,
        difficulty: 0.5,
        information_value: 0.65,
        prompt: (
            "Under pressure, what do you protect first?",
            "压力之下，你最先守护的是什么？",
        ),
        options: [
            ("My standards", "我的标准", &[Qian]),
            ("The mood of the group", "团队的气氛", &[Dui]),
            ("My clarity of purpose", "我目标的清晰", &[Li]),
            ("My momentum", "我的冲劲", &[Zhen]),
        ],
        targets: &[Qian, Dui, Li, Zhen],
    },
    Row {
        id: "in-d2",
        axis: Axis::Intrinsic,
        stage: Stage::Discrimination,
        difficulty: 0.5,
        information_value: 0.65,
        prompt: ("When you feel stuck, what helps most?", "感到停滞时，什么最有帮助？"),
        options: [
            ("Adapting step by step", "一步步调整", &[Xun]),
            ("Going deeper into the problem", "更深入问题", &[Kan]),
            ("Stopping to take stock", "停下来盘点", &[Gen]),
            ("Leaning on people I trust", "依靠信任的人", &[Kun]),
        ],
        targets: &[Xun, Kan, Gen, Kun],
    },
    Row {
        id: "in-d3",
        axis: Axis::Intrinsic,
        stage: Stage::Discrimination,
        difficulty: 0.55,
        information_value: 0.6,
        prompt: ("What kind of legacy appeals to you?", "哪种传承最吸引你？"),
        options: [
            ("Something I built", "我建立的事业", &[Qian]),
            ("Ideas that light the way", "照亮道路的思想", &[Li]),
            ("Wisdom earned through hardship", "历经磨难得来的智慧", &[Kan]),
            ("A community that thrives", "繁荣的社群", &[Kun]),
        ],
        targets: &[Qian, Li, Kan, Kun],
    },
    Row {
        id: "in-c1",
        axis: Axis::Intrinsic,
        stage: Stage::Confirmation,
        difficulty: 0.6,
        information_value: 0.7,
        prompt: ("Which sentence sounds most like you?", "哪句话最像你？"),
        options: [
            ("Joy is worth chasing", "快乐值得追寻", &[Dui]),
            ("I act before I doubt", "我先行动再怀疑", &[Zhen]),
            ("I bend so I do not break", "我以柔克刚", &[Xun]),
            ("I know when to stop", "我知道何时止步", &[Gen]),
        ],
        targets: &[Dui, Zhen, Xun, Gen],
    },
    Row {
        id: "in-c2",
        axis: Axis::Intrinsic,
        stage: Stage::Confirmation,
        difficulty: 0.6,
        information_value: 0.7,
        prompt: (
            "Which inner voice do you hear most often?",
            "你最常听到哪个内心的声音？",
        ),
        options: [
            ("Aim higher", "目标再高一些", &[Qian]),
            ("See it clearly", "看清楚", &[Li]),
            ("Look beneath the surface", "看透表面之下", &[Kan]),
            ("Hold everyone together", "把大家凝聚在一起", &[Kun]),
        ],
        targets: &[Qian, Li, Kan, Kun],
    },
    // -- External behavior ---------------------------------------------------
    Row {
        id: "ex-x1",
        axis: Axis::External,
        stage: Stage::Exploration,
        difficulty: 0.3,
        information_value: 0.5,
        prompt: ("At a party, where are you usually found?", "在聚会上，你通常在哪里？"),
        options: [
            ("Hosting or leading the toasts", "主持或带头祝酒", &[Qian, Dui]),
            ("In the middle of a lively debate", "在热烈讨论的中心", &[Li, Zhen]),
            ("Moving between small groups", "在小圈子之间游走", &[Xun, Kan]),
            ("In a quiet corner with one friend", "与一位朋友在安静的角落", &[Gen, Kun]),
        ],
        targets: &[],
    },
    Row {
        id: "ex-x2",
        axis: Axis::External,
        stage: Stage::Exploration,
        difficulty: 0.3,
        information_value: 0.5,
        prompt: (
            "A plan falls apart at the last minute. You...",
            "计划在最后一刻泡汤，你会……",
        ),
        options: [
            ("Take charge and improvise", "接手并即兴发挥", &[Qian, Zhen]),
            ("Lighten the mood and rally people", "缓和气氛并鼓舞大家", &[Dui, Li]),
            ("Step back and analyse what went wrong", "退一步分析哪里出了错", &[Kan, Gen]),
            ("Check everyone is okay, then adapt", "先确认大家都好，再调整", &[Kun, Xun]),
        ],
        targets: &[],
    },
    Row {
        id: "ex-x3",
        axis: Axis::External,
        stage: Stage::Exploration,
        difficulty: 0.35,
        information_value: 0.55,
        prompt: ("How do you usually make a decision?", "你通常如何做决定？"),
        options: [
            ("Quickly, from principle", "依原则迅速决定", &[Qian, Li]),
            ("By talking it through with others", "与他人商量", &[Dui, Kun]),
            ("By testing it in action", "在行动中检验", &[Zhen, Kan]),
            ("Slowly, gathering every detail", "慢慢收集每个细节", &[Xun, Gen]),
        ],
        targets: &[],
    },
    Row {
        id: "ex-d1",
        axis: Axis::External,
        stage: Stage::Discrimination,
        difficulty: 0.5,
        information_value: 0.65,
        prompt: ("In a team, your usual role is...", "在团队中，你通常的角色是……"),
        options: [
            ("The one who sets direction", "定方向的人", &[Qian]),
            ("The one who keeps spirits up", "鼓舞士气的人", &[Dui]),
            ("The one who presents the ideas", "展示想法的人", &[Li]),
            ("The one who starts things moving", "推动事情开始的人", &[Zhen]),
        ],
        targets: &[Qian, Dui, Li, Zhen],
    },
    Row {
        id: "ex-d2",
        axis: Axis::External,
        stage: Stage::Discrimination,
        difficulty: 0.5,
        information_value: 0.65,
        prompt: ("When conflict arises, you tend to...", "冲突出现时，你倾向于……"),
        options: [
            ("Negotiate a middle path", "协商折中的办法", &[Xun]),
            ("Probe for the hidden cause", "探寻隐藏的原因", &[Kan]),
            ("Hold your ground calmly", "冷静地坚持立场", &[Gen]),
            ("Smooth things over for everyone", "为大家缓和局面", &[Kun]),
        ],
        targets: &[Xun, Kan, Gen, Kun],
    },
    Row {
        id: "ex-d3",
        axis: Axis::External,
        stage: Stage::Discrimination,
        difficulty: 0.55,
        information_value: 0.6,
        prompt: (
            "On a free weekend you are most likely to...",
            "空闲的周末，你最可能……",
        ),
        options: [
            ("Invite friends over", "邀朋友来家里", &[Dui]),
            ("Try an intense new sport", "尝试刺激的新运动", &[Zhen]),
            ("Wander wherever the day leads", "随心漫游", &[Xun]),
            ("Finish a long personal project", "完成一个长期的个人项目", &[Gen]),
        ],
        targets: &[Dui, Zhen, Xun, Gen],
    },
    Row {
        id: "ex-c1",
        axis: Axis::External,
        stage: Stage::Confirmation,
        difficulty: 0.6,
        information_value: 0.7,
        prompt: (
            "Friends would most likely describe you as...",
            "朋友最可能这样形容你……",
        ),
        options: [
            ("Decisive", "果断", &[Qian]),
            ("Radiant", "光彩照人", &[Li]),
            ("Deep", "深沉", &[Kan]),
            ("Dependable", "可靠", &[Kun]),
        ],
        targets: &[Qian, Li, Kan, Kun],
    },
    Row {
        id: "ex-c2",
        axis: Axis::External,
        stage: Stage::Confirmation,
        difficulty: 0.6,
        information_value: 0.7,
        prompt: ("Which habit is most truly yours?", "哪个习惯最真正属于你？"),
        options: [
            ("Laughing easily", "容易开怀大笑", &[Dui]),
            ("Acting on impulse", "凭冲动行事", &[Zhen]),
            ("Adjusting to any room", "适应任何场合", &[Xun]),
            ("Keeping firm routines", "保持稳定的作息", &[Gen]),
        ],
        targets: &[Dui, Zhen, Xun, Gen],
    },
];

static DEFAULT_ITEMS: Lazy<Vec<Item>> = Lazy::new(|| ROWS.iter().map(build_item).collect());

fn build_item(row: &Row) -> Item {
    let options = OptionKey::ALL.map(|key| {
        let (en, zh, favored) = row.options[key.index()];
        let base = if favored.len() > 1 {
            PAIR_BASE
        } else {
            SINGLE_BASE
        };
        let mut impacts = [base; ARCHETYPE_COUNT];
        for a in favored {
            impacts[a.index()] = FAVORED;
        }
        ItemOption {
            key,
            text: LocalizedText::new(en, zh),
            impacts,
        }
    });

    Item {
        id: row.id.to_string(),
        axis: row.axis,
        prompt: LocalizedText::new(row.prompt.0, row.prompt.1),
        options,
        difficulty: row.difficulty,
        information_value: row.information_value,
        stage: Some(row.stage),
        targets: row.targets.to_vec(),
    }
}

/// The built-in fallback catalog.
pub fn default_catalog() -> Catalog {
    Catalog::new(DEFAULT_ITEMS.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_balanced_and_well_formed() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 16);
        for axis in Axis::ALL {
            assert_eq!(catalog.axis_len(axis), 8);
            for stage in Stage::ACTIVE {
                assert!(catalog
                    .for_axis(axis)
                    .any(|item| item.stage == Some(stage)));
            }
        }
        assert!(catalog.items().iter().all(|item| !item.has_degenerate_impacts()));
    }

    #[test]
    fn exploration_items_favour_every_archetype_once() {
        let catalog = default_catalog();
        for item in catalog
            .items()
            .iter()
            .filter(|i| i.stage == Some(Stage::Exploration))
        {
            for a in Archetype::ALL {
                let favoured = item
                    .options
                    .iter()
                    .filter(|o| o.impact(a) == FAVORED)
                    .count();
                assert_eq!(favoured, 1, "{} / {a}", item.id);
            }
        }
    }
}
