use crate::domain::{AnalysisTarget, AnalysisTargetKind, TargetPayload};

pub const SYSTEM_PROMPT: &str = r#"你是一位資深的台股與美股分析師。
請以繁體中文撰寫，使用 Markdown 條列重點，內容精簡但具深度。
你的分析僅供參考，不可保證獲利，也不可構成投資建議。"#;

/// User prompt for a target. When `feedback` is present the model is asked
/// to correct its previous report accordingly.
pub fn build_prompt(target: &AnalysisTarget, feedback: Option<&str>) -> String {
    let mut prompt = match target.payload() {
        Some(payload) => describe(payload),
        None => format!("分析項目：{}（{}）\n", target.id(), kind_label(target.kind())),
    };

    prompt.push_str(instructions(target.kind()));

    if let Some(feedback) = feedback {
        prompt.push_str("\n使用者指出先前報告的錯誤如下，請據此修正並重新撰寫完整報告：\n");
        prompt.push_str(feedback);
        prompt.push('\n');
    }

    prompt
}

fn kind_label(kind: AnalysisTargetKind) -> &'static str {
    match kind {
        AnalysisTargetKind::Event => "股市事件",
        AnalysisTargetKind::HotTrend => "資金熱點族群",
        AnalysisTargetKind::Strategy => "操作策略",
    }
}

fn describe(payload: &TargetPayload) -> String {
    match payload {
        TargetPayload::Event(e) => {
            let related = e
                .related_stocks
                .as_ref()
                .filter(|s| !s.is_empty())
                .map(|s| s.join(", "))
                .unwrap_or_else(|| "無".to_string());
            format!(
                "分析股市事件：{}\n日期：{}\n市場：{}\n趨勢預判：{}\n描述：{}\n相關個股：{}\n",
                e.title, e.date, e.market, e.trend, e.description, related
            )
        }
        TargetPayload::HotTrend(t) => format!(
            "分析資金熱點族群：{}\n資金強度：{}/100\n趨勢：{}\n成分股：{}\n原因：{}\n",
            t.name,
            t.strength,
            t.trend,
            t.stocks.join(", "),
            t.reason
        ),
        TargetPayload::Strategy(s) => format!(
            "分析操作策略：{}\n方向：{}\n說明：{}\n風險：{}\n適用標的：{}\n",
            s.title, s.strategy_type, s.desc, s.risk, s.target
        ),
    }
}

fn instructions(kind: AnalysisTargetKind) -> &'static str {
    match kind {
        AnalysisTargetKind::Event => {
            "\n請針對此事件提供一份簡短但深度的「戰略報告」，包含以下三點：\n\
             1. 【深度解讀】：為什麼這個事件對當前市場至關重要？\n\
             2. 【歷史借鏡】：過去類似事件發生時，市場通常如何反應？\n\
             3. 【實戰建議】：給散戶的具體操作建議（例如：觀察哪個價位、是否該避險、或是積極進場）。\n"
        }
        AnalysisTargetKind::HotTrend => {
            "\n請提供此族群的分析報告，包含以下四點：\n\
             1. 【技術面】：目前所處的趨勢階段與關鍵價位。\n\
             2. 【基本面】：支撐這波資金行情的產業邏輯。\n\
             3. 【風險評估】：可能讓行情結束的訊號。\n\
             4. 【操作建議】：進場點、停損、停利與持有期間。\n"
        }
        AnalysisTargetKind::Strategy => {
            "\n請評估此策略，包含以下四點：\n\
             1. 【策略原理】：為什麼這個策略在當前盤勢有效？\n\
             2. 【執行細節】：進場時機、倉位配置與出場策略。\n\
             3. 【風險控管】：最大虧損、對沖方法與警示訊號。\n\
             4. 【歷史表現】：類似情境下的成功機率。\n"
        }
    }
}
