//! Prompt templates for the chat and guided flows

use crate::request::GuidedAnswer;

/// Persona prepended to every free-chat message
pub const CHAT_PERSONA: &str = "あなたはMission CompassのAI相棒。口調は丁寧で前向き、回答は短く要点を箇条書きし、最後に「今日の一歩」を1文で提案してください。";

/// Guided questionnaire, asked in order
pub const GUIDED_QUESTIONS: [&str; 5] = [
  "初めまして。どんなキャリアに関心がありますか？（例：教育／起業／研究／クリエイティブ など）",
  "これまでで一番『充実していた瞬間』は？ どんな活動・理由でしたか？",
  "あなたが大事にしている価値観を3つ挙げてください。（例：挑戦・誠実・貢献 など）",
  "人から頼られがちな『強み』は何ですか？（例：整理／説明／前に進める など）",
  "周りや社会に『こう役立ちたい』と思うことは何ですか？",
];

const SUMMARY_INSTRUCTIONS: [&str; 10] = [
  "あなたはキャリア戦略コーチです。以下のQ&Aから、ユーザーの価値観・情熱を発掘し、",
  "最後に心に響く『ミッション・ステートメント』を日本語で1行にまとめてください。",
  "",
  "出力は厳密に次のJSONだけにしてください：",
  r#"{ "values": ["...","...", "..."], "passions": ["...","..."], "statement": "..." }"#,
  "",
  "制約：",
  "• valuesは抽象語（例：誠実・挑戦・貢献）。3語を目安に。",
  "• passionsは具体的な興味や活動（例：人の成長を助ける、複雑な課題を解く）。2〜3個まで。",
  "• statementは30〜50字程度。「私は、…」で始める。",
];

const ANSWERS_HEADER: &str = "―― 以下、ユーザーの回答 ――";

pub fn question_count() -> usize
{   GUIDED_QUESTIONS.len()
}

pub fn question(step: usize) -> Option<&'static str>
{   GUIDED_QUESTIONS.get(step).copied()
}

pub fn chat_prompt(message: &str) -> String
{   format!("{}\n\nユーザー: {}", CHAT_PERSONA, message)
}

/// `Q1: ...\nA1: ...` blocks for at most one answer per question
pub fn format_answers(answers: &[GuidedAnswer]) -> String
{   answers
      .iter()
      .take(question_count())
      .enumerate()
      .map(|(i, x)| format!("Q{n}: {}\nA{n}: {}", x.q, x.a, n = i + 1))
      .collect::<Vec<_>>()
      .join("\n\n")
}

pub fn summary_prompt(answers: &[GuidedAnswer]) -> String
{   let mut lines: Vec<String> = SUMMARY_INSTRUCTIONS
      .iter()
      .map(|l| l.to_string())
      .collect();
    lines.push(String::new());
    lines.push(ANSWERS_HEADER.to_string());
    lines.push(format_answers(answers));
    lines.join("\n")
}
