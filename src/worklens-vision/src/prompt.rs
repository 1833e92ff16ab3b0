//! Fixed screenshot classification instruction
//!
//! The closed activity vocabulary and the prompt-extraction heuristics
//! are part of the artifact contract; downstream aggregation counts on
//! the exact label strings below.

pub const CLASSIFY_INSTRUCTION: &str = r#"Create a json object

activity: <First, only look at the active window or active tab i.e. where the user's cursor or keyboard typing is active. Which one of the following best describes the work the user is doing on the active window. Pick any one of the following "Coding", "AI Copilot in IDE" (double check the user must be in a code editor (native application), and not on any website that looks like a code editor), "Reading Documentation" (must be an official documentation, make a guess based on url if the url or page header looks like one for an official documentation), "Reading Web articles/documents" (for articles, blogs, PDFs or reports on other webpages), "Reading Stackoverflow", "Watching video tutorial", "Interacting with AI Chatbot" (select this if the user is on an AI website like chatgpt, bolt.new, lovable.dev, claude, gemini, perplexity), "Testing" (select if the user is running their code in a command line or opening a website created by them, for example on localhost, mstunnels, ngrok), "Creating Document" (word, excel, powerpoint), "Reading code in GitHub", "Google Search", "Other". You can pick only one category from double quotes, and do not make a category of your own.>
open_windows: [
{
app: <Find out which app or web app the user is using>,
action: <What is the user doing on this app, answer based on what you see in the contents of the app, include as many details as you can in 1 line>,
prompt: <copy paste what the user is asking the AI/Search engine to do. Only populate this field if you can see what the user has typed into a text box (and it is not a textbox hint like "How can bolt help you today?" or "Edit code (Ctrl+I), @ to mention"). You should be 100% confident that whatever you are copy pasting here was typed into a text box by a human (you know it was written by a human if it starts with small characters, improper grammar or punctuation use).>,
},
{...},
{...}
]

If the user has multiple windows open with split screen, you can return one object for each window you see. If there's one primary window and others are in the background you can skip returning details about the windows in the background. Only return multiple when the user is using split screen. Ignore the user webcam image overlays if any are present."#;
