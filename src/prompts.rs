//! Prompts for the three model stages.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: the wording the model sees is edited in
//!    exactly one place.
//!
//! 2. **Testability**: unit tests inspect the assembled prompts directly
//!    without a live model, which is how the analysis-mode contract (which
//!    prior artefacts go into the report prompt) is pinned down.
//!
//! Callers can override the system instruction via
//! [`crate::config::ReportConfig::system_prompt`]; the stage instructions
//! are fixed.

use crate::config::AnalysisMode;

/// System instruction describing the financial-document-analysis persona.
pub const SYSTEM_PROMPT: &str = r#"You are a multimodal financial analysis assistant designed to interpret images of financial documents such as earnings reports, balance sheets, and annual reports.

Your task is to process images that may contain text, tables, graphs, or financial figures, and extract relevant information to assist analysts, investors, and auditors. Each image should be analyzed in its own context, and the extracted content should be structured, complete, and actionable.

You must:
- Read and interpret all textual, numerical, and visual content (e.g., graphs, charts, diagrams).
- Understand financial language and terminology.
- Identify key financial metrics (e.g., revenue, income, EPS), changes over time, and relevant ratios.
- Extract and summarize operational highlights, risks, strategic priorities, and other insights mentioned in the visuals or text.
- Provide outputs that are structured and tailored for further processing (e.g., in JSON or bullet points).

You will be guided by specific prompts to:
1. Extract the content fo each image.
2. Identify key insights and important information.
3. Generate structured summaries or reports for decision-making.

Be accurate, concise, and context-aware. Prioritize clarity and completeness in financial interpretation."#;

/// Stage 1 instruction, sent after the page images.
pub const EXTRACT_CONTENT_PROMPT: &str = r#"For each image, extract and organize the content into four main categories: textual content, tables, graphs, and metadata. Return the results in a structured JSON format as described below.

For every image, provide a JSON object with the following fields:
- "image_name": the name of the image file (e.g., "page_1.png")
- "text_content": all visible text, including paragraphs, figure captions, headers, footnotes, and in-text financial figures. Do not summarize; extract it verbatim.
- "tables": a list of tables found in the image, represented using markdown format. Preserve the layout and numerical accuracy of each table as much as possible.
- "graphs": a list of visual graphs or charts with descriptive text explaining their content. For each graph, describe:
  - the chart type (e.g., bar chart, line graph, pie chart),
  - axis labels and units,
  - data series or variables displayed,
  - titles and legends (if present),
  - trends or key visual takeaways.
- "metadata": any additional visual elements not captured in the above fields, such as logos, icons, signatures, footers, page numbers, section dividers, or decorative illustrations. Summarize them briefly.

Process each image independently. Ensure the structure is consistent and no content is duplicated across fields.

Example format:
[
  {
    "image_name": "page_1.png",
    "text_content": "Revenue increased by 12% year-over-year...",
    "tables": [
      "| Metric         | Q1 2024 | Q1 2023 |\n|----------------|---------|---------|\n| Revenue        | $25B    | $22.4B  |"
    ],
    "graphs": [
      "Bar chart titled 'Quarterly Revenue Growth'. X-axis: Quarters (Q1 2023–Q1 2024), Y-axis: Revenue in billions. Shows consistent growth with a noticeable spike in Q4 2023."
    ],
    "metadata": "Tesla logo at top left, page number 1 at bottom right."
  },
  ...
]"#;

/// Stage 1: the single instruction text sent after all page images.
///
/// The filenames are listed in the same order as the attached images so the
/// model's `image_name` values line up with the files on disk.
pub fn extract_content_prompt<S: AsRef<str>>(image_names: &[S]) -> String {
    let names: Vec<&str> = image_names.iter().map(AsRef::as_ref).collect();
    format!(
        "{}\n\nThe images above are, in order: {}.",
        EXTRACT_CONTENT_PROMPT,
        names.join(", ")
    )
}

/// Stage 2: insight synthesis over the whole extraction reply.
pub fn key_insights_prompt(extraction: &str) -> String {
    format!(
        r#"You are a financial analyst assistant. You are given a set of structured data extracted from a financial report, including text content, tables, graphs, and other metadata, organized by page.

Your task is to:
- Identify and extract the most relevant and actionable financial insights from the content.
- Focus on key metrics, trends, risks, strategic moves, and commentary that help investors or professionals quickly understand the company’s performance.
- Avoid repeating raw data. Instead, summarize and analyze each point clearly and concisely.
- Group related insights across multiple images if applicable, and provide deep, context-aware commentary.

Prioritize content related to:
- Revenue, profit, and margin trends
- Year-over-year and quarter-over-quarter comparisons
- Guidance and forecasts
- Operational metrics
- Risk factors and challenges
- Strategic initiatives (e.g., R&D, expansion, M&A)
- Shareholder information (e.g., dividends, stock performance)
- Visual insights from tables and graphs (explain them clearly)

Output Format:
Return a list of dictionaries, where each dictionary represents a distinct section of the report. Each dictionary must have:

- "title": A concise and informative title for this insight section.
- "content": A summarized and insightful explanation or analysis of the key points, aggregating information across related images.
- "sources": A list of image filenames (e.g., "page_1.png", "page_2.png") that support the analysis.

Example Output Structure:
[
  {{
    "title": "Revenue Growth and Profitability Trends",
    "content": "The company reported a 12% YoY increase in revenue driven by higher unit sales and pricing power. Operating margin improved to 18% due to cost optimizations and supply chain efficiencies. These trends are consistent across multiple business units.",
    "sources": ["page_3.png", "page_5.png"]
  }},
  {{
    "title": "Future Outlook and Strategic Priorities",
    "content": "Management reiterated strong demand projections for Q2, emphasizing expansion into emerging markets and continued investment in R&D, particularly in AI-based vehicle systems.",
    "sources": ["page_7.png", "page_9.png"]
  }}
]

Content:
{extraction}
"#
    )
}

/// Stage 3 instruction: required sections and the closing image manifest.
pub const GENERATE_REPORT_PROMPT: &str = r#"You are a financial analyst AI assistant. Using the extracted key insights from the financial document images, generate a clear, comprehensive, and well-structured financial report in Markdown format.

Your report should include the following sections (but not limited to):

1. **Executive Summary**:
   A concise overview of the company’s financial health and strategic direction.

2. **Key Financial Metrics**:
   Highlight revenue, net income, earnings per share (EPS), growth trends compared to previous periods, and relevant financial ratios (profitability, liquidity, leverage).

3. **Financial Statements Overview**:
   Summarize key points from the balance sheet, income statement, and cash flow statement, emphasizing assets, liabilities, equity, revenue, expenses, and cash flows.

4. **Operational Performance and Market Conditions**:
   Insights on company operations, market environment, and external economic factors.

5. **Management Commentary and Strategic Priorities**:
   Summarize management’s outlook, strategic plans, and any relevant risks or challenges.

6. **Notable Events**:
   Cover acquisitions, partnerships, shareholder-related information such as dividends and stock performance.

7. **Risks and Mitigation**:
   Discuss any risks, challenges, and the company’s approach to managing those risks.

8. (additional sections as needed based on the insights provided)...
...

Additionally, include a section for **Graphs and Tables** where you summarize the key visual insights from the images. Use markdown tables to represent any tabular data clearly.

Use the provided key points as the source of information. Wherever appropriate, reference the image names (e.g., "page_3.png") containing relevant details by mentioning them in parentheses.

Format your output with clear headings, bullet points, and tables where necessary to enhance readability.

Only includes non-empty sections where you count with enough information to provide a meaningful summary/insight.
Leave out any sections that do not have sufficient information to report on.

---

**Note:** At the end of the report, include a section titled "Images to Attach" listing all unique image filenames referenced throughout the document for manual attachment. Leave the rest of the report content as is, without any additional instructions or comments.
Also, enhance readability and engagement by using relevant emojis such as 📈 (growth), 📉 (decline), 💰 (financial metrics), and 🔍 (insights) throughout the report.
Add a fitting title to the report, such as "Financial Report for Q1 2025" or "Earnings Update for Q1 2025".

---
"#;

/// Stage 3: the full report prompt for the given mode.
///
/// [`AnalysisMode::FullContext`] includes the raw extraction followed by the
/// insights; [`AnalysisMode::Smart`] includes the insights only.
pub fn generate_report_prompt(mode: AnalysisMode, extraction: &str, insights: &str) -> String {
    let insights_block = format!(
        "Here are the key insights extracted from the content:\n{insights}\n"
    );

    let source_material = if mode.includes_extraction() {
        format!(
            "Here is the extracted content from the images structured in a json format:\n{extraction}\n\nAnd {insights_block}"
        )
    } else {
        insights_block
    };

    format!("{GENERATE_REPORT_PROMPT}\n{source_material}")
}
