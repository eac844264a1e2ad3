/// JavaScript run inside the page. Scripts that take an element receive it as
/// `arguments[0]`.
pub struct PageScripts;

impl PageScripts {
    pub fn ready_state() -> &'static str {
        "return document.readyState;"
    }

    pub fn snapshot() -> &'static str {
        r#"
            const body = document.body;
            if (!body) {
                return { text_sample: '', node_count: 0, height: 0, width: 0, interactive_count: 0 };
            }
            const text = (body.innerText || '').substring(0, 1000);
            return {
                text_sample: text,
                node_count: document.getElementsByTagName('*').length,
                height: Math.round(body.scrollHeight || 0),
                width: Math.round(body.scrollWidth || 0),
                interactive_count: document.querySelectorAll(arguments[0]).length
            };
        "#
    }

    pub fn describe() -> &'static str {
        r#"
            const el = arguments[0];
            const style = window.getComputedStyle(el);
            const rect = el.getBoundingClientRect();
            const displayed = rect.width > 0 && rect.height > 0
                && style.display !== 'none'
                && style.visibility !== 'hidden';

            function pathOf(node) {
                // XPath 1.0 string literals cannot escape a double quote.
                if (node.id && node.id.indexOf('"') === -1) {
                    return '//*[@id="' + node.id + '"]';
                }
                const parts = [];
                while (node && node.nodeType === Node.ELEMENT_NODE) {
                    let index = 1;
                    let sibling = node.previousSibling;
                    while (sibling) {
                        if (sibling.nodeType === Node.ELEMENT_NODE && sibling.nodeName === node.nodeName) {
                            index++;
                        }
                        sibling = sibling.previousSibling;
                    }
                    parts.unshift(node.nodeName.toLowerCase() + '[' + index + ']');
                    node = node.parentNode;
                }
                return '/' + parts.join('/');
            }

            const attr = name => el.getAttribute(name);
            const value = (typeof el.value === 'string' && el.value) ? el.value : attr('value');
            return {
                displayed: displayed,
                tag: el.tagName.toLowerCase(),
                text: (el.innerText || el.textContent || '').replace(/\s+/g, ' ').trim(),
                aria_label: attr('aria-label'),
                title: attr('title'),
                value: value,
                href: attr('href'),
                path: pathOf(el)
            };
        "#
    }

    pub fn scroll_into_view() -> &'static str {
        "arguments[0].scrollIntoView({block: 'center', inline: 'center'});"
    }

    pub fn script_click() -> &'static str {
        "arguments[0].click();"
    }

    pub fn visible_content() -> &'static str {
        r#"
            function visible(el) {
                const style = window.getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                return rect.width > 0 && rect.height > 0
                    && style.display !== 'none'
                    && style.visibility !== 'hidden';
            }
            function clean(s) {
                return (s || '').replace(/\s+/g, ' ').trim();
            }

            const seen = new Set();
            const texts = [];
            for (const el of document.querySelectorAll('h1,h2,h3,h4,h5,h6,p,li,blockquote,figcaption,td,label')) {
                if (texts.length >= 200) break;
                if (!visible(el)) continue;
                const t = clean(el.innerText);
                if (!t || seen.has(t)) continue;
                seen.add(t);
                texts.push(t);
            }

            const links = [];
            for (const a of document.querySelectorAll('a[href]')) {
                if (links.length >= 100) break;
                if (!visible(a)) continue;
                const t = clean(a.innerText) || clean(a.getAttribute('aria-label'));
                if (!t) continue;
                links.push({ text: t, href: a.getAttribute('href') || '' });
            }

            const buttons = [];
            for (const b of document.querySelectorAll("button, [role='button'], input[type='submit'], input[type='button']")) {
                if (buttons.length >= 50) break;
                if (!visible(b)) continue;
                const t = clean(b.innerText) || clean(b.value) || clean(b.getAttribute('aria-label'));
                if (t) buttons.push(t);
            }

            const inputs = [];
            for (const i of document.querySelectorAll("input:not([type='hidden']):not([type='submit']):not([type='button']), textarea, select")) {
                if (inputs.length >= 50) break;
                if (!visible(i)) continue;
                const kind = i.tagName.toLowerCase() === 'input' ? (i.getAttribute('type') || 'text') : i.tagName.toLowerCase();
                const hint = clean(i.getAttribute('placeholder'))
                    || clean(i.getAttribute('aria-label'))
                    || clean(i.getAttribute('name'));
                inputs.push(hint ? kind + ': ' + hint : kind);
            }

            return {
                title: document.title || '',
                texts: texts,
                links: links,
                buttons: buttons,
                inputs: inputs
            };
        "#
    }

    pub fn cleaned_body() -> &'static str {
        r#"
            if (!document.body) return '';
            const copy = document.body.cloneNode(true);
            copy.querySelectorAll('script, style, link, meta, noscript, iframe').forEach(n => n.remove());
            return copy.outerHTML;
        "#
    }

    pub fn scroll_height() -> &'static str {
        "return Math.round(document.body ? document.body.scrollHeight : 0);"
    }

    pub fn scroll_to() -> &'static str {
        "window.scrollTo(0, arguments[0]);"
    }

    pub fn scroll_by() -> &'static str {
        "window.scrollBy(0, arguments[0]);"
    }
}
