pub const BINDING_NAME: &str = "__autoSigninPanel";
pub const PANEL_ATTRIBUTE: &str = "data-auto-signin-debug-panel";
pub const BUTTON_SELECTORS: &str = r#"button, input[type="button"], a.btn, .button, [role="button"]"#;

/// Quotes a value as a JavaScript string literal.
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "''".to_string())
}

pub fn element_exists(selector: &str) -> String {
    format!(
        r#"(function(){{try{{return document.querySelector({})!==null}}catch(e){{return false}}}})()"#,
        js_string(selector)
    )
}

pub fn click_element(selector: &str) -> String {
    format!(
        r#"(function(){{let el=null;try{{el=document.querySelector({})}}catch(e){{return{{found:false}}}}if(!el)return{{found:false}};el.scrollIntoView({{block:'center',behavior:'instant'}});el.click();return{{found:true}}}})()"#,
        js_string(selector)
    )
}

/// `performance.timeOrigin` is fixed for the lifetime of a document.
pub const DOCUMENT_ID: &str = "String(performance.timeOrigin)";

pub const BODY_TEXT: &str =
    r#"(function(){return document.body?(document.body.innerText||document.body.textContent||''):''})()"#;

pub fn list_buttons(highlight: bool) -> String {
    format!(
        r#"(function(){{return Array.from(document.querySelectorAll({})).map(function(b){{if({})b.style.border='2px solid red';return{{text:String(b.innerText||b.value||b.textContent||'').trim(),classes:String(b.className||''),id:String(b.id||'')}}}})}})()"#,
        js_string(BUTTON_SELECTORS),
        highlight
    )
}

/// Builds the floating panel from `rows_json` (`[{field,label,value}]`).
/// Returns `false` when a panel already exists.
pub fn show_panel(rows_json: &str) -> String {
    format!(
        r#"(function(){{
if(document.querySelector('[{attr}]'))return false;
const rows={rows};
const panel=document.createElement('div');
panel.setAttribute('{attr}','true');
Object.assign(panel.style,{{position:'fixed',bottom:'10px',right:'10px',width:'300px',padding:'10px',backgroundColor:'rgba(0,0,0,0.8)',color:'#fff',borderRadius:'5px',zIndex:'9999',fontSize:'12px',maxHeight:'300px',overflowY:'auto'}});
const title=document.createElement('h3');
title.textContent='Auto check-in debug panel';
Object.assign(title.style,{{margin:'0 0 10px 0',color:'#4CAF50'}});
panel.appendChild(title);
for(const r of rows){{const row=document.createElement('div');row.style.margin='5px 0';const l=document.createElement('span');l.textContent=r.label+': ';l.style.fontWeight='bold';const v=document.createElement('span');v.setAttribute('data-field',r.field);v.textContent=r.value;row.appendChild(l);row.appendChild(v);panel.appendChild(row);}}
const send=function(action){{if(typeof window.{binding}==='function')window.{binding}(JSON.stringify({{action:action}}));}};
const buttons=[['Force sign-in','force_sign_in','#4CAF50'],['Reset sign time','reset_sign_time','#4CAF50'],['Find buttons','find_buttons','#4CAF50'],['Check now','check_now','#2196F3']];
for(const b of buttons){{const el=document.createElement('button');el.textContent=b[0];Object.assign(el.style,{{margin:'5px 5px 5px 0',padding:'5px 10px',backgroundColor:b[2],border:'none',borderRadius:'3px',color:'white',cursor:'pointer'}});el.addEventListener('click',function(){{send(b[1])}});panel.appendChild(el);}}
const close=document.createElement('span');
close.textContent='×';
Object.assign(close.style,{{position:'absolute',top:'5px',right:'10px',cursor:'pointer',fontSize:'16px'}});
close.addEventListener('click',function(){{panel.style.display='none'}});
panel.appendChild(close);
document.body.appendChild(panel);
return true;
}})()"#,
        attr = PANEL_ATTRIBUTE,
        rows = rows_json,
        binding = BINDING_NAME,
    )
}

pub fn update_panel(rows_json: &str) -> String {
    format!(
        r#"(function(){{const panel=document.querySelector('[{}]');if(!panel)return false;for(const r of {}){{const v=panel.querySelector('[data-field="'+r.field+'"]');if(v)v.textContent=r.value;}}return true}})()"#,
        PANEL_ATTRIBUTE, rows_json
    )
}
